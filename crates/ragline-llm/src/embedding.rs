use async_trait::async_trait;
use tracing::debug;

use ragline_core::config::{EmbedderSettings, LlmSettings};
use ragline_core::traits::Embedder;
use ragline_core::Error;

use crate::gemini::{build_http, post_json, GeminiConfig};
use crate::types::{BatchEmbedBody, BatchEmbedResponse, EmbedRequest, WireContent, WirePart};

/// Output width of `text-embedding-004`.
pub const GEMINI_EMBEDDING_DIM: usize = 768;

/// Remote text embedder backed by `batchEmbedContents`.
pub struct GeminiEmbedder {
    http: reqwest::Client,
    config: GeminiConfig,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(config: GeminiConfig, model: impl Into<String>) -> anyhow::Result<Self> {
        let http = build_http(config.timeout_secs)?;
        Ok(Self { http, config, model: model.into() })
    }

    pub fn from_settings(llm: &LlmSettings, embedder: &EmbedderSettings) -> anyhow::Result<Self> {
        Self::new(GeminiConfig::from(llm), embedder.model.clone())
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn dim(&self) -> usize {
        GEMINI_EMBEDDING_DIM
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let qualified = format!("models/{}", self.model);
        let body = BatchEmbedBody {
            requests: texts
                .iter()
                .map(|t| EmbedRequest {
                    model: qualified.clone(),
                    content: WireContent { role: None, parts: vec![WirePart::text(t.clone())] },
                })
                .collect(),
        };
        debug!(model = %self.model, n = texts.len(), "gemini batchEmbedContents");
        let url = self.config.endpoint(&self.model, "batchEmbedContents");
        let parsed: BatchEmbedResponse = post_json(&self.http, &url, &body).await?;
        if parsed.embeddings.len() != texts.len() {
            return Err(Error::ExternalService(format!(
                "asked for {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            ))
            .into());
        }
        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}
