//! Wire types for the Generative Language API v1beta.

use serde::{Deserialize, Serialize};

use ragline_core::content::encode_base64;
use ragline_core::types::{GenerationRequest, Part};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentBody {
    pub contents: Vec<WireContent>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl WirePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }

    pub fn inline(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self { text: None, inline_data: Some(InlineData { mime_type: mime_type.into(), data: encode_base64(bytes) }) }
    }
}

impl From<&Part> for WirePart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text(t) => WirePart::text(t.clone()),
            Part::Image { mime_type, data } => WirePart::inline(mime_type.clone(), data),
        }
    }
}

/// A single user turn carrying every part of the request in order.
pub fn user_content(request: &GenerationRequest) -> WireContent {
    WireContent { role: Some("user".to_string()), parts: request.parts.iter().map(WirePart::from).collect() }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<WireContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate that has any, joined.
    pub fn text(&self) -> Option<String> {
        self.candidates.iter().filter_map(|c| c.content.as_ref()).find_map(|content| {
            let text: String = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();
            (!text.trim().is_empty()).then_some(text)
        })
    }
}

#[derive(Debug, Serialize)]
pub struct EmbedRequest {
    pub model: String,
    pub content: WireContent,
}

#[derive(Debug, Serialize)]
pub struct BatchEmbedBody {
    pub requests: Vec<EmbedRequest>,
}

#[derive(Debug, Deserialize)]
pub struct BatchEmbedResponse {
    #[serde(default)]
    pub embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingValues {
    #[serde(default)]
    pub values: Vec<f32>,
}
