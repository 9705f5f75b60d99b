//! Wiring from `Settings` to a ready `RagEngine`.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use ragline_core::config::{expand_path, EmbedderKind, Settings, StoreBackend};
use ragline_core::traits::{Embedder, Generator};
use ragline_core::types::GenerationRequest;
use ragline_core::Error;
use ragline_embed::{local_embedder, EmbeddingAdapter};
use ragline_llm::{GeminiClient, GeminiEmbedder, GeminiExtractor};
use ragline_vector::{LanceDocStore, LanceIndex, MultiVectorStore};

use crate::engine::RagEngine;

/// Bounds every call to the wrapped generator by a deadline.
pub struct DeadlineGenerator {
    inner: Arc<dyn Generator>,
    deadline: Duration,
}

impl DeadlineGenerator {
    pub fn new(inner: Arc<dyn Generator>, deadline: Duration) -> Self {
        Self { inner, deadline }
    }
}

#[async_trait]
impl Generator for DeadlineGenerator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        match tokio::time::timeout(self.deadline, self.inner.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::ExternalService(format!(
                "{} did not answer within {:?}",
                self.inner.name(),
                self.deadline
            ))
            .into()),
        }
    }
}

pub async fn build_store(settings: &Settings) -> anyhow::Result<Arc<MultiVectorStore>> {
    let store = &settings.store;
    match store.backend {
        StoreBackend::Memory => Ok(Arc::new(MultiVectorStore::in_memory(store.metric))),
        StoreBackend::Lance => {
            let dir = expand_path(&store.path);
            tokio::fs::create_dir_all(&dir).await?;
            let uri = dir.to_string_lossy().to_string();
            let index = LanceIndex::open(&uri, &store.summaries_table, store.metric).await?;
            let docs = LanceDocStore::open(&uri, &store.documents_table).await?;
            info!(path = %uri, "opened LanceDB store");
            Ok(Arc::new(MultiVectorStore::new(Arc::new(index), Arc::new(docs))))
        }
    }
}

pub fn build_embedder(settings: &Settings) -> anyhow::Result<Arc<dyn Embedder>> {
    match settings.embedder.kind {
        EmbedderKind::Gemini => Ok(Arc::new(GeminiEmbedder::from_settings(&settings.llm, &settings.embedder)?)),
        EmbedderKind::Hash | EmbedderKind::Local => local_embedder(&settings.embedder),
    }
}

/// The generative model, or `None` when no API key is configured.
pub fn build_generator(settings: &Settings) -> anyhow::Result<Option<Arc<dyn Generator>>> {
    if settings.llm.api_key.trim().is_empty() {
        info!("no LLM API key configured; running without a generative model");
        return Ok(None);
    }
    let client: Arc<dyn Generator> = Arc::new(GeminiClient::from_settings(&settings.llm)?);
    let deadline = Duration::from_secs(settings.llm.timeout_secs.max(1));
    Ok(Some(Arc::new(DeadlineGenerator::new(client, deadline))))
}

pub async fn build_engine(settings: &Settings) -> anyhow::Result<RagEngine> {
    settings.validate()?;
    let store = build_store(settings).await?;
    let deadline = Duration::from_secs(settings.llm.timeout_secs.max(1));
    let embedder = EmbeddingAdapter::new(build_embedder(settings)?).with_deadline(deadline);
    let generator = build_generator(settings)?;
    let engine = RagEngine::new(store, embedder, generator.clone(), settings.clone());
    Ok(match generator {
        Some(g) => engine.with_extractor(Arc::new(GeminiExtractor::new(g))),
        None => engine,
    })
}
