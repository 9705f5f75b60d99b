//! Embedding backends.
//!
//! `EmbeddingModel` runs BGE-M3 (XLM-RoBERTa) locally through candle and is
//! served off the async runtime by `LocalEmbedder`. `HashEmbedder` is a
//! deterministic feature-hashing embedder for offline use and tests, and
//! `EmbeddingAdapter` wraps any backend with the fail-open policy used by
//! ingestion and retrieval.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use ragline_core::config::{expand_path, EmbedderKind, EmbedderSettings};
use ragline_core::traits::Embedder;

pub mod adapter;
pub mod device;
pub mod hash;
pub mod pool;
pub mod tokenize;

pub use adapter::EmbeddingAdapter;
pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;

pub const BGE_M3_DIM: usize = 1024;
const MAX_LEN: usize = 256;

pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl EmbeddingModel {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = device::select_device();
        info!(dir = %model_dir.display(), "loading BGE-M3 model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let vb = load_weights(model_dir, &device)?;
        let model = XLMRobertaModel::new(&config, vb)?;
        info!("BGE-M3 model loaded");
        Ok(Self { model, tokenizer, device })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_on_device(&self.tokenizer, text, MAX_LEN, &self.device)?;
        let token_type_ids = Tensor::zeros((1, MAX_LEN), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        if emb.len() != BGE_M3_DIM {
            return Err(anyhow!("unexpected embedding width {} (expected {})", emb.len(), BGE_M3_DIM));
        }
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 {
            debug!(ms = elapsed.as_millis() as u64, "slow embedding");
        }
        Ok(emb)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is treated as read-only for the life of the model.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)? };
        return Ok(vb);
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&weights_path)?;
    let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
}

/// `Embedder` front for the local model. Inference runs on the blocking pool.
#[derive(Clone)]
pub struct LocalEmbedder {
    model: Arc<EmbeddingModel>,
}

impl LocalEmbedder {
    pub fn new(model: EmbeddingModel) -> Self {
        Self { model: Arc::new(model) }
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn dim(&self) -> usize {
        BGE_M3_DIM
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || texts.iter().map(|t| model.embed_text(t)).collect())
            .await
            .map_err(|e| anyhow!("embedding task failed: {}", e))?
    }
}

/// Builds the configured local embedder. `APP_USE_FAKE_EMBEDDINGS=1` forces
/// the hashing embedder regardless of settings.
pub fn local_embedder(settings: &EmbedderSettings) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake || settings.kind == EmbedderKind::Hash {
        info!(dim = settings.dim, "using hash embedder");
        return Ok(Arc::new(HashEmbedder::new(settings.dim)));
    }
    match settings.kind {
        EmbedderKind::Local => {
            let model = EmbeddingModel::load(&resolve_model_dir(settings.model_dir.as_deref())?)?;
            Ok(Arc::new(LocalEmbedder::new(model)))
        }
        other => Err(anyhow!("embedder kind {:?} is not a local backend", other)),
    }
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = configured
        .map(expand_path)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from))
        .chain(std::env::var("MODEL_DIR").ok().map(PathBuf::from))
        .chain([PathBuf::from("../models/bge-m3"), PathBuf::from("models/bge-m3")]);
    for dir in candidates {
        if dir.exists() {
            info!(dir = %dir.display(), "using model directory");
            return Ok(dir);
        }
        warn!(dir = %dir.display(), "model directory not found");
    }
    Err(anyhow!("Could not locate BGE-M3 model directory"))
}
