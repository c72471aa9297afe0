//! # vela-acl
//!
//! Content protection for the Vela indexing pipeline.
//!
//! Protected content is indexed together with the access keys of the
//! principals allowed to see it, so search results can be filtered without
//! consulting the content tree at query time.

pub mod directory;
pub mod resolver;

pub use directory::{AccessKeyDirectory, MemoryAccessKeyDirectory};
pub use resolver::{
    AccessRule, NoProtection, ProtectionResolver, PublicAccessEntry, PublicAccessResolver,
};
