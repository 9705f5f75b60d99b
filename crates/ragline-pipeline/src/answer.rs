use std::sync::Arc;
use tracing::error;

use ragline_core::traits::Generator;
use ragline_core::types::GenerationRequest;

/// Retrieval-only answer when nothing was retrieved.
pub const NOTHING_FOUND: &str = "No relevant data found.";

/// Retrieval-only mode: the retrieved texts verbatim, one per line.
pub fn retrieval_only(texts: &[String]) -> String {
    if texts.is_empty() {
        NOTHING_FOUND.to_string()
    } else {
        texts.join("\n")
    }
}

pub struct AnswerGenerator {
    generator: Arc<dyn Generator>,
}

impl AnswerGenerator {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Never fails: a model error becomes an `Error: ...` answer.
    pub async fn answer(&self, request: &GenerationRequest) -> String {
        match self.generator.generate(request).await {
            Ok(text) => text,
            Err(e) => {
                error!(model = self.generator.name(), error = %e, "answer generation failed");
                format!("Error: {e}")
            }
        }
    }
}
