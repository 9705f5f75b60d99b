use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use tracing::{debug, warn};

use ragline_core::traits::VectorIndex;
use ragline_core::types::{DistanceMetric, DocId, EmbeddingRecord, IndexHit, Meta};
use ragline_core::{Error, Result};

use crate::distance::{distance, normalized};
use crate::disambiguate;

/// Brute-force in-process index. Cosine vectors are normalized on insert.
pub struct MemoryIndex {
    metric: DistanceMetric,
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    dim: Option<usize>,
    records: Vec<EmbeddingRecord>,
    ids: HashSet<DocId>,
}

impl MemoryIndex {
    pub fn new(metric: DistanceMetric) -> Self {
        Self { metric, inner: RwLock::new(Inner::default()) }
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new(DistanceMetric::Cosine)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn dim(&self) -> Result<Option<usize>> {
        Ok(self.inner.read().dim)
    }

    async fn add(&self, record: EmbeddingRecord) -> Result<Option<DocId>> {
        if record.vector.is_empty() {
            warn!(doc_id = %record.doc_id, "rejecting zero-length embedding");
            return Ok(None);
        }
        let mut inner = self.inner.write();
        if inner.records.is_empty() {
            inner.dim = Some(record.vector.len());
        }
        match inner.dim {
            Some(d) if d != record.vector.len() => {
                return Err(Error::IntegrityViolation(format!(
                    "embedding for '{}' has dimension {}, index holds {}",
                    record.doc_id,
                    record.vector.len(),
                    d
                )));
            }
            _ => {}
        }
        let id = disambiguate(&record.doc_id, |candidate| inner.ids.contains(candidate));
        if id != record.doc_id {
            debug!(requested = %record.doc_id, assigned = %id, "doc id collision");
        }
        let vector = match self.metric {
            DistanceMetric::Cosine => normalized(&record.vector),
            DistanceMetric::L2 => record.vector,
        };
        inner.ids.insert(id.clone());
        inner.records.push(EmbeddingRecord { doc_id: id.clone(), vector, metadata: record.metadata });
        Ok(Some(id))
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        let inner = self.inner.read();
        if k == 0 || inner.records.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(d) = inner.dim {
            if d != vector.len() {
                return Err(Error::IntegrityViolation(format!(
                    "query has dimension {}, index holds {}",
                    vector.len(),
                    d
                )));
            }
        }
        let mut hits: Vec<IndexHit> = inner
            .records
            .iter()
            .map(|r| IndexHit {
                doc_id: r.doc_id.clone(),
                metadata: r.metadata.clone(),
                distance: distance(self.metric, vector, &r.vector),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn remove(&self, doc_id: &str) -> Result<bool> {
        let mut inner = self.inner.write();
        if !inner.ids.remove(doc_id) {
            return Ok(false);
        }
        inner.records.retain(|r| r.doc_id != doc_id);
        if inner.records.is_empty() {
            inner.dim = None;
        }
        Ok(true)
    }

    async fn entries(&self) -> Result<Vec<(DocId, Meta)>> {
        Ok(self.inner.read().records.iter().map(|r| (r.doc_id.clone(), r.metadata.clone())).collect())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.write() = Inner::default();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.read().records.len())
    }
}
