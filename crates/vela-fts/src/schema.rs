//! Tantivy schema for physical content indexes.
//!
//! # Schema Fields
//!
//! - `doc_key`: Item key (STRING | STORED)
//! - `object_type`: Repository object type (STRING | STORED)
//! - `path_id`: One value per ancestor-or-self key (STRING), used to delete
//!   whole branches
//! - `variation`: One `culture|segment` value per variation (STRING | STORED)
//! - `access_key`: Protection access keys (STRING | STORED)
//! - `content`: All textual field values (TEXT, `en_stem`)
//! - `payload`: The JSON-encoded document (STORED)

use tantivy::Index;
use tantivy::schema::{
    Field, IndexRecordOption, STORED, STRING, Schema, SchemaBuilder, TextFieldIndexing,
    TextOptions,
};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, Stemmer, TextAnalyzer};

/// Name of the stemming tokenizer used by the `content` field.
pub const TOKENIZER_NAME: &str = "en_stem";

/// Field handles of the physical index schema.
#[derive(Clone)]
pub struct DocumentSchema {
    schema: Schema,
    /// Item key.
    pub doc_key: Field,
    /// Object type.
    pub object_type: Field,
    /// Ancestor-or-self keys.
    pub path_id: Field,
    /// Variations as `culture|segment`.
    pub variation: Field,
    /// Access keys.
    pub access_key: Field,
    /// Full-text content.
    pub content: Field,
    /// JSON payload.
    pub payload: Field,
}

impl DocumentSchema {
    /// Build the schema.
    pub fn build() -> Self {
        let mut builder = SchemaBuilder::new();

        let text_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(TOKENIZER_NAME)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );

        let doc_key = builder.add_text_field("doc_key", STRING | STORED);
        let object_type = builder.add_text_field("object_type", STRING | STORED);
        let path_id = builder.add_text_field("path_id", STRING);
        let variation = builder.add_text_field("variation", STRING | STORED);
        let access_key = builder.add_text_field("access_key", STRING | STORED);
        let content = builder.add_text_field("content", text_options);
        let payload = builder.add_text_field("payload", STORED);

        Self {
            schema: builder.build(),
            doc_key,
            object_type,
            path_id,
            variation,
            access_key,
            content,
            payload,
        }
    }

    /// The underlying Tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Register the stemming tokenizer with an index.
    ///
    /// Must be called after creating or opening an index.
    pub fn register_tokenizers(index: &Index) {
        let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(Stemmer::new(tantivy::tokenizer::Language::English))
            .build();

        index.tokenizers().register(TOKENIZER_NAME, en_stem);
    }
}

impl std::fmt::Debug for DocumentSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSchema")
            .field("field_count", &self.schema.fields().count())
            .finish()
    }
}
