use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DistanceMetric, DocId, DocumentUnit, EmbeddingRecord, GenerationRequest, IndexHit, Meta, SourceKind};

/// Maps text (and optionally images) into a fixed-dimension vector space.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
    /// Image embedding for multimodal models. The default returns an empty
    /// vector, meaning "nothing to index".
    async fn embed_image(&self, _image: &[u8]) -> anyhow::Result<Vec<f32>> {
        Ok(Vec::new())
    }
}

/// A generative model reachable through a narrow text/image interface.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String>;
}

/// Turns a non-text source (pdf, audio, video) into raw text.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, bytes: &[u8], kind: SourceKind) -> anyhow::Result<String>;
}

/// Storage of (id, embedding, metadata) records with nearest-neighbor lookup.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn metric(&self) -> DistanceMetric;
    /// Dimension shared by all stored vectors, `None` while empty.
    async fn dim(&self) -> Result<Option<usize>>;
    /// Stores a record and returns the id it was stored under. Zero-length
    /// vectors are rejected with `Ok(None)`. A colliding id gets a numeric
    /// suffix instead of overwriting.
    async fn add(&self, record: EmbeddingRecord) -> Result<Option<DocId>>;
    /// Up to `k` nearest records, closest first.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>>;
    async fn remove(&self, doc_id: &str) -> Result<bool>;
    /// Every stored id with its metadata, in insertion order where the
    /// backend keeps one.
    async fn entries(&self) -> Result<Vec<(DocId, Meta)>>;
    async fn clear(&self) -> Result<()>;
    async fn len(&self) -> Result<usize>;
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

/// Mapping from id to the original unit returned for generation.
#[async_trait]
pub trait DocStore: Send + Sync {
    async fn put(&self, unit: DocumentUnit) -> Result<()>;
    async fn get(&self, doc_id: &str) -> Result<DocumentUnit>;
    async fn remove(&self, doc_id: &str) -> Result<bool>;
    async fn clear(&self) -> Result<()>;
    async fn len(&self) -> Result<usize>;
}
