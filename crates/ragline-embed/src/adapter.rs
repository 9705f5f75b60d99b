use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use ragline_core::traits::Embedder;

/// Fail-open front for an embedder.
///
/// Empty input, a backend error or a missed deadline all come back as an
/// empty vector, which callers treat as "nothing to index".
#[derive(Clone)]
pub struct EmbeddingAdapter {
    inner: Arc<dyn Embedder>,
    deadline: Option<Duration>,
}

impl EmbeddingAdapter {
    pub fn new(inner: Arc<dyn Embedder>) -> Self {
        Self { inner, deadline: None }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn dim(&self) -> usize {
        self.inner.dim()
    }

    pub async fn embed(&self, text: &str) -> Vec<f32> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        let batch = [text.to_string()];
        let call = self.inner.embed_batch(&batch);
        let result = match self.deadline {
            Some(d) => match tokio::time::timeout(d, call).await {
                Ok(r) => r,
                Err(_) => Err(anyhow::anyhow!("embedding timed out after {:?}", d)),
            },
            None => call.await,
        };
        match result {
            Ok(mut vectors) if !vectors.is_empty() => vectors.swap_remove(0),
            Ok(_) => {
                warn!("embedder returned no vector");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "text embedding failed");
                Vec::new()
            }
        }
    }

    pub async fn embed_image(&self, image: &[u8]) -> Vec<f32> {
        if image.is_empty() {
            return Vec::new();
        }
        let call = self.inner.embed_image(image);
        let result = match self.deadline {
            Some(d) => match tokio::time::timeout(d, call).await {
                Ok(r) => r,
                Err(_) => Err(anyhow::anyhow!("image embedding timed out after {:?}", d)),
            },
            None => call.await,
        };
        result.unwrap_or_else(|e| {
            warn!(error = %e, "image embedding failed");
            Vec::new()
        })
    }
}
