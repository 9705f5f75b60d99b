use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Summary embeddings: id, JSON-encoded metadata and the vector itself.
pub fn build_summaries_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}

/// Original units. Text payloads go to `text`, image bytes to `data`.
pub fn build_documents_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("kind", DataType::Utf8, false),
        Field::new("source_ref", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, true),
        Field::new("data", DataType::Binary, true),
    ]))
}

/// Reads the vector width from a summaries schema.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
    match schema.field_with_name("vector").ok()?.data_type() {
        DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
        _ => None,
    }
}
