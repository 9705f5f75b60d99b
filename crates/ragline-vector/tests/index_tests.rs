use ragline_core::traits::{DocStore, VectorIndex};
use ragline_core::types::{DistanceMetric, DocumentUnit, EmbeddingRecord, ContentKind, Meta};
use ragline_core::Error;
use ragline_vector::distance::{cosine_distance, l2_distance, normalized};
use ragline_vector::{disambiguate, MemoryDocStore, MemoryIndex};

fn record(id: &str, v: Vec<f32>) -> EmbeddingRecord {
    EmbeddingRecord { doc_id: id.to_string(), vector: v, metadata: Meta::new() }
}

#[test]
fn distances_behave() {
    assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
    assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
    assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    assert!((l2_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-6);
    let n = normalized(&[3.0, 4.0]);
    assert!((n[0] - 0.6).abs() < 1e-6 && (n[1] - 0.8).abs() < 1e-6);
}

#[test]
fn disambiguate_appends_suffix() {
    let taken = ["a", "a-1"];
    assert_eq!(disambiguate("b", |c| taken.contains(&c)), "b");
    assert_eq!(disambiguate("a", |c| taken.contains(&c)), "a-2");
    assert_eq!(disambiguate("  ", |_| false), "doc");
}

#[tokio::test]
async fn nearest_first_and_capped_at_k() {
    let idx = MemoryIndex::new(DistanceMetric::Cosine);
    idx.add(record("x", vec![1.0, 0.0, 0.0])).await.unwrap();
    idx.add(record("y", vec![0.0, 1.0, 0.0])).await.unwrap();
    idx.add(record("z", vec![0.7, 0.7, 0.0])).await.unwrap();

    let hits = idx.query(&[1.0, 0.1, 0.0], 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].doc_id, "x");
    assert_eq!(hits[1].doc_id, "z");
    assert!(hits[0].distance <= hits[1].distance);

    assert!(idx.query(&[1.0, 0.0, 0.0], 0).await.unwrap().is_empty());
    assert_eq!(idx.query(&[1.0, 0.0, 0.0], 10).await.unwrap().len(), 3);
}

#[tokio::test]
async fn empty_vector_is_rejected_without_storing() {
    let idx = MemoryIndex::default();
    assert_eq!(idx.add(record("x", vec![])).await.unwrap(), None);
    assert_eq!(idx.len().await.unwrap(), 0);
    assert_eq!(idx.dim().await.unwrap(), None);
}

#[tokio::test]
async fn dimension_mismatch_is_integrity_violation() {
    let idx = MemoryIndex::default();
    idx.add(record("x", vec![1.0, 0.0])).await.unwrap();
    assert_eq!(idx.dim().await.unwrap(), Some(2));
    let err = idx.add(record("y", vec![1.0, 0.0, 0.0])).await.unwrap_err();
    assert!(matches!(err, Error::IntegrityViolation(_)));
    assert_eq!(idx.len().await.unwrap(), 1);

    // a cleared index adopts a new width
    idx.clear().await.unwrap();
    assert_eq!(idx.add(record("y", vec![1.0, 0.0, 0.0])).await.unwrap().as_deref(), Some("y"));
}

#[tokio::test]
async fn colliding_ids_never_overwrite() {
    let idx = MemoryIndex::default();
    assert_eq!(idx.add(record("doc", vec![1.0, 0.0])).await.unwrap().as_deref(), Some("doc"));
    assert_eq!(idx.add(record("doc", vec![0.0, 1.0])).await.unwrap().as_deref(), Some("doc-1"));
    assert_eq!(idx.add(record("doc", vec![1.0, 1.0])).await.unwrap().as_deref(), Some("doc-2"));
    assert_eq!(idx.len().await.unwrap(), 3);

    assert!(idx.remove("doc-1").await.unwrap());
    assert!(!idx.remove("doc-1").await.unwrap());
    let ids: Vec<String> = idx.entries().await.unwrap().into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["doc".to_string(), "doc-2".to_string()]);
}

#[tokio::test]
async fn doc_store_round_trip() {
    let store = MemoryDocStore::new();
    store.put(DocumentUnit::text("a", ContentKind::Table, "| x |", "t.csv")).await.unwrap();
    assert_eq!(store.get("a").await.unwrap().kind, ContentKind::Table);
    assert!(matches!(store.get("b").await, Err(Error::NotFound(_))));
    assert!(store.remove("a").await.unwrap());
    assert_eq!(store.len().await.unwrap(), 0);
}
