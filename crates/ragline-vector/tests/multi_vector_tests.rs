use async_trait::async_trait;
use std::sync::Arc;

use ragline_core::traits::{DocStore, VectorIndex};
use ragline_core::types::{ContentKind, DistanceMetric, DocumentUnit, Meta, META_SUMMARY};
use ragline_core::{Error, Result};
use ragline_vector::{MemoryIndex, MultiVectorStore};

struct RefusingDocStore;

#[async_trait]
impl DocStore for RefusingDocStore {
    async fn put(&self, _unit: DocumentUnit) -> Result<()> {
        Err(Error::Operation("disk full".into()))
    }
    async fn get(&self, doc_id: &str) -> Result<DocumentUnit> {
        Err(Error::NotFound(doc_id.to_string()))
    }
    async fn remove(&self, _doc_id: &str) -> Result<bool> {
        Ok(false)
    }
    async fn clear(&self) -> Result<()> {
        Ok(())
    }
    async fn len(&self) -> Result<usize> {
        Ok(0)
    }
}

fn summary(text: &str) -> Meta {
    Meta::from([(META_SUMMARY.to_string(), text.to_string())])
}

#[tokio::test]
async fn put_then_get_returns_original_unit() {
    let store = MultiVectorStore::in_memory(DistanceMetric::Cosine);
    let unit = DocumentUnit::text("t1", ContentKind::Table, "| a | b |\n| 1 | 2 |", "sheet.csv");
    let id = store.put(unit.clone(), vec![0.0, 1.0], summary("a small table")).await.unwrap().unwrap();
    assert_eq!(id, "t1");
    assert_eq!(store.get(&id).await.unwrap(), unit);

    let hits = store.search_resolved(&[0.0, 1.0], 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].1.as_ref().unwrap().kind, ContentKind::Table);

    let entries = store.entries().await.unwrap();
    assert_eq!(entries[0].summary, "a small table");
    assert_eq!(entries[0].kind, ContentKind::Table);
    assert_eq!(entries[0].source_ref, "sheet.csv");
}

#[tokio::test]
async fn collision_stores_unit_under_suffixed_id() {
    let store = MultiVectorStore::in_memory(DistanceMetric::Cosine);
    let a = DocumentUnit::text("same", ContentKind::Text, "first", "a");
    let b = DocumentUnit::text("same", ContentKind::Text, "second", "b");
    store.put(a, vec![1.0, 0.0], Meta::new()).await.unwrap();
    let id = store.put(b, vec![0.0, 1.0], Meta::new()).await.unwrap().unwrap();
    assert_eq!(id, "same-1");
    assert_eq!(store.get("same").await.unwrap().content.as_text(), Some("first"));
    assert_eq!(store.get("same-1").await.unwrap().content.as_text(), Some("second"));
}

#[tokio::test]
async fn empty_embedding_stores_nothing() {
    let store = MultiVectorStore::in_memory(DistanceMetric::Cosine);
    let unit = DocumentUnit::text("x", ContentKind::Text, "hi", "src");
    assert_eq!(store.put(unit, Vec::new(), Meta::new()).await.unwrap(), None);
    assert!(store.is_empty().await.unwrap());
    assert!(matches!(store.get("x").await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn failed_document_write_rolls_back_index() {
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::default());
    let store = MultiVectorStore::new(index.clone(), Arc::new(RefusingDocStore));
    let unit = DocumentUnit::text("x", ContentKind::Text, "hi", "src");
    assert!(store.put(unit, vec![1.0], Meta::new()).await.is_err());
    assert_eq!(index.len().await.unwrap(), 0);
}

#[tokio::test]
async fn clear_is_idempotent() {
    let store = MultiVectorStore::in_memory(DistanceMetric::Cosine);
    store.clear().await.unwrap();
    store.put(DocumentUnit::text("x", ContentKind::Text, "hi", "s"), vec![1.0, 0.0], Meta::new()).await.unwrap();
    store.clear().await.unwrap();
    store.clear().await.unwrap();
    assert_eq!(store.len().await.unwrap(), 0);
    assert!(store.search(&[1.0, 0.0], 3).await.unwrap().is_empty());
    assert!(store.entries().await.unwrap().is_empty());
}
