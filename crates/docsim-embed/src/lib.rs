//! Local embedding backends.
//!
//! [`BertEmbedder`] runs a sentence-transformer BERT checkpoint
//! (all-MiniLM-L12-v2 layout) through candle with masked mean pooling.
//! [`HashingEmbedder`] is a deterministic bag-of-tokens stand-in for
//! development and tests; it is selected with `embedding.fake = true` or
//! `APP_USE_FAKE_EMBEDDINGS=1`.

mod device;
mod pool;
mod tokenize;

pub use device::select_device;
pub use pool::masked_mean_l2;

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{info, warn};

use docsim_core::config::{expand_path, EmbeddingSettings};
use docsim_core::{Embedder, Error};

const DEFAULT_MODEL_DIR: &str = "models/all-MiniLM-L12-v2";
const FORWARD_BATCH: usize = 32;

pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
}

impl BertEmbedder {
    /// Load `config.json`, `tokenizer.json` and weights (`model.safetensors`,
    /// falling back to `pytorch_model.bin`) from `model_dir`.
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading sentence embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        tokenize::configure_tokenizer(&mut tokenizer, max_len)?;

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config).context("Failed to build BERT model")?;
        info!(dim, max_len, "embedding model loaded");
        Ok(Self { model, tokenizer, device, dim })
    }

    fn forward(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, token_type_ids, attention_mask) = tokenize::tokenize_batch(&self.tokenizer, texts, &self.device)?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        Ok(pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()?)
    }

    fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(FORWARD_BATCH) { out.extend(self.forward(batch)?); }
        info!(count = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(out)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return candle_core::safetensors::load(&safetensors, device)
            .with_context(|| format!("Failed to load {}", safetensors.display()));
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let tensors = candle_core::pickle::read_all(&pickle)
            .with_context(|| format!("Failed to load {}", pickle.display()))?;
        return Ok(tensors.into_iter().collect());
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

impl Embedder for BertEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> docsim_core::Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(vec![]); }
        self.embed_all(texts).map_err(|e| Error::embed(format!("{e:#}")))
    }
}

/// Hashes whitespace tokens into buckets and L2-normalises the result.
pub struct HashingEmbedder { dim: usize }

impl HashingEmbedder {
    /// `dim` is clamped to at least 1.
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> docsim_core::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn fake_requested(settings: &EmbeddingSettings) -> bool {
    settings.fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
}

/// Build the configured embedder. A missing or unloadable model is a startup failure.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> docsim_core::Result<Arc<dyn Embedder>> {
    if fake_requested(settings) {
        info!(dim = settings.fake_dim, "using HashingEmbedder");
        return Ok(Arc::new(HashingEmbedder::new(settings.fake_dim)));
    }
    let model_dir = resolve_model_dir(settings.model_dir.as_deref()).map_err(|e| Error::EmbedUnavailable(e.to_string()))?;
    let embedder = BertEmbedder::load(&model_dir, settings.max_len).map_err(|e| Error::EmbedUnavailable(format!("{e:#}")))?;
    Ok(Arc::new(embedder))
}

/// Explicit setting first, then `RUSTBERT_CACHE`, `MODEL_DIR`, then `models/all-MiniLM-L12-v2`.
pub fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = expand_path(dir);
        if p.join("config.json").exists() { return Ok(p); }
        return Err(anyhow!("Configured model dir {} has no config.json", p.display()));
    }
    for var in ["RUSTBERT_CACHE", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = expand_path(&dir);
            if p.join("config.json").exists() { info!("Using {}: {}", var, p.display()); return Ok(p); }
            warn!("{} is set but {} has no config.json", var, p.display());
        }
    }
    let fallback = Path::new(DEFAULT_MODEL_DIR);
    if fallback.join("config.json").exists() { return Ok(fallback.to_path_buf()); }
    Err(anyhow!("Could not locate a sentence embedding model directory"))
}
