use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::debug;

use ragline_core::config::LlmSettings;
use ragline_core::traits::Generator;
use ragline_core::types::GenerationRequest;
use ragline_core::Error;

use crate::types::{user_content, GenerateContentBody, GenerateContentResponse, GenerationConfig};

/// Connection settings for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Base URL (default: https://generativelanguage.googleapis.com)
    pub base_url: String,
    /// Model used for text-only requests.
    pub model: String,
    /// Model used when the request carries images or media.
    pub vision_model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl From<&LlmSettings> for GeminiConfig {
    fn from(s: &LlmSettings) -> Self {
        Self {
            api_key: s.api_key.clone(),
            base_url: s.base_url.clone(),
            model: s.model.clone(),
            vision_model: s.vision_model.clone(),
            temperature: s.temperature,
            max_output_tokens: s.max_output_tokens,
            timeout_secs: s.timeout_secs,
        }
    }
}

impl GeminiConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub(crate) fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}?key={}", self.base_url.trim_end_matches('/'), model, method, self.api_key)
    }
}

pub(crate) fn build_http(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(Duration::from_secs(timeout_secs)).build()?)
}

fn map_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::ExternalService(format!("timed out: {err}"))
    } else {
        Error::external(err)
    }
}

/// POSTs `body` and decodes a JSON reply; non-2xx statuses become
/// `ExternalService` errors carrying the response text.
pub(crate) async fn post_json<B, R>(http: &reqwest::Client, url: &str, body: &B) -> Result<R, Error>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let resp = http.post(url).json(body).send().await.map_err(map_error)?;
    let status = resp.status();
    let text = resp.text().await.map_err(map_error)?;
    if !status.is_success() {
        return Err(Error::ExternalService(format!("HTTP {}: {}", status.as_u16(), text)));
    }
    serde_json::from_str(&text).map_err(|e| Error::ExternalService(format!("unreadable response: {e}")))
}

pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        let http = build_http(config.timeout_secs)?;
        Ok(Self { http, config })
    }

    pub fn from_settings(settings: &LlmSettings) -> anyhow::Result<Self> {
        Self::new(GeminiConfig::from(settings))
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl Generator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        if request.parts.is_empty() {
            return Err(Error::EmptyInput.into());
        }
        let model = if request.image_count() > 0 { &self.config.vision_model } else { &self.config.model };
        let body = GenerateContentBody {
            contents: vec![user_content(request)],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        };
        debug!(model = %model, parts = request.parts.len(), "gemini generateContent");
        let url = self.config.endpoint(model, "generateContent");
        let parsed: GenerateContentResponse = post_json(&self.http, &url, &body).await?;
        if let Some(text) = parsed.text() {
            return Ok(text);
        }
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .or_else(|| parsed.candidates.into_iter().find_map(|c| c.finish_reason))
            .unwrap_or_else(|| "no candidates".to_string());
        Err(Error::ExternalService(format!("empty response from {model}: {reason}")).into())
    }
}
