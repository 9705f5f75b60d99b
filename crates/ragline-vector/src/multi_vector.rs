//! Multi-vector store: summaries are embedded and indexed, while the
//! original unit is kept under the same id for generation.
//!
//! Writers hold the store lock for the whole index+docstore write, so a
//! reader never sees a summary whose unit is not stored yet.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use ragline_core::traits::{DocStore, VectorIndex};
use ragline_core::types::{
    ContentKind, DistanceMetric, DocId, DocumentUnit, EmbeddingRecord, IndexHit, Meta, StoredEntry, META_KIND, META_SOURCE,
    META_SUMMARY,
};
use ragline_core::Result;

use crate::{MemoryDocStore, MemoryIndex};

pub struct MultiVectorStore {
    index: Arc<dyn VectorIndex>,
    docs: Arc<dyn DocStore>,
    lock: RwLock<()>,
}

impl MultiVectorStore {
    pub fn new(index: Arc<dyn VectorIndex>, docs: Arc<dyn DocStore>) -> Self {
        Self { index, docs, lock: RwLock::new(()) }
    }

    pub fn in_memory(metric: DistanceMetric) -> Self {
        Self::new(Arc::new(MemoryIndex::new(metric)), Arc::new(MemoryDocStore::new()))
    }

    pub fn metric(&self) -> DistanceMetric {
        self.index.metric()
    }

    /// Indexes `embedding` under `unit.id` (suffixed on collision) and stores
    /// the unit under the assigned id. Returns `None` when the embedding is
    /// empty and nothing was stored.
    pub async fn put(&self, unit: DocumentUnit, embedding: Vec<f32>, mut metadata: Meta) -> Result<Option<DocId>> {
        metadata.entry(META_KIND.to_string()).or_insert_with(|| unit.kind.as_str().to_string());
        metadata.entry(META_SOURCE.to_string()).or_insert_with(|| unit.source_ref.clone());

        let _guard = self.lock.write().await;
        let record = EmbeddingRecord { doc_id: unit.id.clone(), vector: embedding, metadata };
        let Some(assigned) = self.index.add(record).await? else {
            return Ok(None);
        };
        let unit = DocumentUnit { id: assigned.clone(), ..unit };
        if let Err(e) = self.docs.put(unit).await {
            warn!(doc_id = %assigned, error = %e, "document write failed; rolling back index record");
            if let Err(rollback) = self.index.remove(&assigned).await {
                warn!(doc_id = %assigned, error = %rollback, "index rollback failed");
            }
            return Err(e);
        }
        debug!(doc_id = %assigned, "stored unit");
        Ok(Some(assigned))
    }

    pub async fn get(&self, doc_id: &str) -> Result<DocumentUnit> {
        let _guard = self.lock.read().await;
        self.docs.get(doc_id).await
    }

    pub async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        let _guard = self.lock.read().await;
        self.index.query(vector, k).await
    }

    /// Searches and resolves every hit to its unit under a single read lock.
    /// Hits whose unit cannot be loaded come back as `Err` so the caller can
    /// decide how to report them.
    pub async fn search_resolved(&self, vector: &[f32], k: usize) -> Result<Vec<(IndexHit, Result<DocumentUnit>)>> {
        let _guard = self.lock.read().await;
        let hits = self.index.query(vector, k).await?;
        let mut out = Vec::with_capacity(hits.len());
        for hit in hits {
            let unit = self.docs.get(&hit.doc_id).await;
            out.push((hit, unit));
        }
        Ok(out)
    }

    /// Empties both sides. Clearing an empty store is a no-op.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.lock.write().await;
        self.index.clear().await?;
        self.docs.clear().await
    }

    pub async fn entries(&self) -> Result<Vec<StoredEntry>> {
        let _guard = self.lock.read().await;
        let rows = self.index.entries().await?;
        Ok(rows
            .into_iter()
            .map(|(doc_id, meta)| StoredEntry {
                kind: meta.get(META_KIND).and_then(|k| ContentKind::parse(k)).unwrap_or(ContentKind::Text),
                source_ref: meta.get(META_SOURCE).cloned().unwrap_or_default(),
                summary: meta.get(META_SUMMARY).cloned().unwrap_or_default(),
                doc_id,
            })
            .collect())
    }

    pub async fn len(&self) -> Result<usize> {
        let _guard = self.lock.read().await;
        self.index.len().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
