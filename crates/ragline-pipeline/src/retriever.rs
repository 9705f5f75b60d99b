use std::sync::Arc;
use tracing::{debug, error};

use ragline_core::types::{Content, RetrievedItem, META_SUMMARY};
use ragline_core::Result;
use ragline_embed::EmbeddingAdapter;
use ragline_vector::MultiVectorStore;

use crate::rerank::Reranker;

/// Query-time lookup: embed, search, resolve to original units, re-rank.
pub struct Retriever {
    embedder: EmbeddingAdapter,
    store: Arc<MultiVectorStore>,
    reranker: Reranker,
}

impl Retriever {
    pub fn new(embedder: EmbeddingAdapter, store: Arc<MultiVectorStore>, reranker: Reranker) -> Self {
        Self { embedder, store, reranker }
    }

    /// At most `k` items, closest first unless re-ranked. Search fetches
    /// `max(initial_k, k)` candidates so the re-ranker has room to reorder.
    pub async fn retrieve(&self, query: &str, k: usize, initial_k: usize) -> Result<Vec<RetrievedItem>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(query).await;
        if vector.is_empty() {
            debug!("query produced no embedding; nothing to search");
            return Ok(Vec::new());
        }
        let fetch = initial_k.max(k);
        let resolved = self.store.search_resolved(&vector, fetch).await?;

        let mut items = Vec::with_capacity(resolved.len());
        for (hit, unit) in resolved {
            match unit {
                Ok(unit) if unit.content.is_empty() => debug!(doc_id = %hit.doc_id, "dropping empty unit"),
                Ok(unit) => items.push(RetrievedItem {
                    unit,
                    distance: hit.distance,
                    summary: hit.metadata.get(META_SUMMARY).cloned(),
                }),
                Err(e) => error!(doc_id = %hit.doc_id, error = %e, "integrity violation: indexed id has no stored unit"),
            }
        }

        let mut items = self.rerank(query, items).await;
        items.truncate(k);
        Ok(items)
    }

    async fn rerank(&self, query: &str, items: Vec<RetrievedItem>) -> Vec<RetrievedItem> {
        if !self.reranker.is_enabled() || items.len() < 2 {
            return items;
        }
        let candidates: Vec<String> = items.iter().map(candidate_text).collect();
        let order = self.reranker.rerank_order(query, &candidates).await;
        let mut slots: Vec<Option<RetrievedItem>> = items.into_iter().map(Some).collect();
        order.into_iter().filter_map(|i| slots.get_mut(i).and_then(Option::take)).collect()
    }
}

/// What the re-ranker sees for an item: the text itself, or the summary
/// for images.
fn candidate_text(item: &RetrievedItem) -> String {
    match &item.unit.content {
        Content::Text(t) => t.clone(),
        Content::Image(_) => item.summary.clone().unwrap_or_else(|| format!("[image from {}]", item.unit.source_ref)),
    }
}
