use std::sync::Arc;

use ragline_core::traits::{DocStore, VectorIndex};
use ragline_core::types::{ContentKind, Content, DistanceMetric, DocumentUnit, Meta, META_SUMMARY};
use ragline_core::Error;
use ragline_vector::{LanceDocStore, LanceIndex, MultiVectorStore};

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

#[tokio::test]
async fn lance_store_round_trip() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let uri = tmp.path().to_string_lossy().to_string();
    let index = Arc::new(LanceIndex::open(&uri, "summaries", DistanceMetric::Cosine).await?);
    let docs = Arc::new(LanceDocStore::open(&uri, "documents").await?);
    let store = MultiVectorStore::new(index.clone(), docs.clone());

    assert!(store.is_empty().await?);
    assert_eq!(index.dim().await?, None);

    let meta = Meta::from([(META_SUMMARY.to_string(), "a chart".to_string())]);
    let img = store.put(DocumentUnit::image("pic", JPEG.to_vec(), "chart.jpg"), vec![1.0, 0.0, 0.0], meta).await?;
    let txt = store
        .put(DocumentUnit::text("pic", ContentKind::Text, "Topic A: fact one.", "notes.txt"), vec![0.0, 1.0, 0.0], Meta::new())
        .await?;
    assert_eq!(img.as_deref(), Some("pic"));
    assert_eq!(txt.as_deref(), Some("pic-1"));
    assert_eq!(store.len().await?, 2);
    assert_eq!(index.dim().await?, Some(3));

    let hits = store.search_resolved(&[0.9, 0.1, 0.0], 1).await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0.doc_id, "pic");
    let unit = hits[0].1.as_ref().map_err(|e| anyhow::anyhow!("{e}"))?;
    assert_eq!(unit.content, Content::Image(JPEG.to_vec()));

    let entries = store.entries().await?;
    assert!(entries.iter().any(|e| e.doc_id == "pic" && e.kind == ContentKind::Image && e.summary == "a chart"));

    let err = store
        .put(DocumentUnit::text("bad", ContentKind::Text, "x", "s"), vec![1.0, 0.0], Meta::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IntegrityViolation(_)));

    store.clear().await?;
    store.clear().await?;
    assert_eq!(store.len().await?, 0);
    assert_eq!(docs.len().await?, 0);
    assert!(store.search(&[1.0, 0.0, 0.0], 3).await?.is_empty());
    Ok(())
}
