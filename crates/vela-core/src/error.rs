//! Error types for the Vela indexing pipeline.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for Vela operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur anywhere in the indexing pipeline.
///
/// Missing content items and items without indexable variations are not
/// errors; strategies treat them as the normal removal path.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Invalid or inconsistent configuration (missing system field producer,
    /// unknown strategy or indexer, duplicate alias). Fatal for the operation
    /// that discovered it.
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic.
        message: String,
    },

    /// A named resource does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Identifier that was looked up.
        id: String,
        /// Kind of resource (e.g. "index", "content item").
        kind: String,
    },

    /// I/O error with the path that caused it.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Input could not be parsed (TOML, JSON payloads, identifiers).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Persisted document cache failure.
    #[error("Storage error: {message}")]
    Storage {
        /// Human-readable error message.
        message: String,
        /// Source error if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A backend operation failed (index writer, queue, etc.).
    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found<I: Into<String>, K: Into<String>>(id: I, kind: K) -> Self {
        Error::NotFound {
            id: id.into(),
            kind: kind.into(),
        }
    }

    /// Creates an I/O error annotated with the offending path.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a parse error.
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Error::Parse(message.into())
    }

    /// Creates a storage error without a source.
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Error::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a storage error wrapping its source.
    pub fn storage_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an operation error.
    pub fn operation<S: Into<String>>(message: S) -> Self {
        Error::Operation(message.into())
    }

    /// Returns whether this error stems from configuration.
    ///
    /// Configuration errors halt the operation that discovered them; they are
    /// never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Config { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = Error::config("no system field producer registered");
        assert_eq!(
            err.to_string(),
            "Configuration error: no system field producer registered"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("content-published", "index");
        assert_eq!(err.to_string(), "index not found: content-published");
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_io_with_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::io_with_path(io, "/tmp/vela");
        assert!(err.to_string().contains("/tmp/vela"));
    }

    #[test]
    fn test_storage_with_source() {
        let io = std::io::Error::other("disk full");
        let err = Error::storage_with_source("cache write failed", io);
        assert_eq!(err.to_string(), "Storage error: cache write failed");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_serde_error_conversion() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: Error = serde_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_error_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
