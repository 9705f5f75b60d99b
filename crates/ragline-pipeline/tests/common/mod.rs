#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ragline_core::config::Settings;
use ragline_core::traits::{Embedder, Generator};
use ragline_core::types::{DistanceMetric, GenerationRequest};
use ragline_embed::{EmbeddingAdapter, HashEmbedder};
use ragline_pipeline::RagEngine;
use ragline_vector::MultiVectorStore;

pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

type Script = dyn Fn(&GenerationRequest) -> anyhow::Result<String> + Send + Sync;

/// Generator answering from a closure and recording every request.
pub struct Scripted {
    script: Box<Script>,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<GenerationRequest>>,
}

impl Scripted {
    pub fn new<F>(f: F) -> Arc<Self>
    where
        F: Fn(&GenerationRequest) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Arc::new(Self { script: Box::new(f), calls: AtomicUsize::new(0), seen: Mutex::new(Vec::new()) })
    }

    pub fn failing() -> Arc<Self> {
        Self::new(|_| Err(anyhow::anyhow!("model unavailable")))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(request.clone());
        (self.script)(request)
    }
}

pub struct Slow;

#[async_trait]
impl Generator for Slow {
    fn name(&self) -> &str {
        "slow"
    }

    async fn generate(&self, _request: &GenerationRequest) -> anyhow::Result<String> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("too late".into())
    }
}

pub struct BrokenEmbedder;

#[async_trait]
impl Embedder for BrokenEmbedder {
    fn dim(&self) -> usize {
        8
    }

    async fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Err(anyhow::anyhow!("embedding backend down"))
    }
}

pub fn hash_adapter() -> EmbeddingAdapter {
    EmbeddingAdapter::new(Arc::new(HashEmbedder::new(256)))
}

fn build(generator: Option<Arc<dyn Generator>>, settings: Settings) -> RagEngine {
    let store = Arc::new(MultiVectorStore::in_memory(DistanceMetric::Cosine));
    RagEngine::new(store, hash_adapter(), generator, settings)
}

/// Engine without a generative model: sentence chunking, no re-ranking.
pub fn offline_engine() -> RagEngine {
    build(None, Settings::default())
}

pub fn engine(generator: Arc<dyn Generator>) -> RagEngine {
    build(Some(generator), Settings::default())
}

pub fn engine_with(generator: Arc<dyn Generator>, settings: Settings) -> RagEngine {
    build(Some(generator), settings)
}
