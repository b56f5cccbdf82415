//! In-process sentence embeddings via fastembed.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{info, warn};

use super::{Embedding, EmbeddingBackend, EmbeddingProvider, DEFAULT_EMBEDDING_DIM};

const LOCAL_MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Locally loaded `all-MiniLM-L6-v2` model.
///
/// Inference is CPU-bound and runs on the blocking pool.
#[derive(Clone)]
pub struct LocalEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl LocalEmbedder {
    /// Loads the model, downloading weights into `cache_dir` on first use.
    pub fn new(cache_dir: Option<PathBuf>) -> Result<Self> {
        let mut options = InitOptions::new(EmbeddingModel::AllMiniLML6V2);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }
        let model = TextEmbedding::try_new(options).context("failed to load local embedding model")?;
        info!(model = LOCAL_MODEL_NAME, "loaded local embedding model");
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }

    fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| anyhow!("local embedding model mutex poisoned"))?;
        model.embed(texts, None).context("local embedding failed")
    }

    async fn embed_many(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.run(texts))
            .await
            .map_err(|err| anyhow!("embedding task join error: {err}"))?
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedder {
    async fn embed(&self, text: &str) -> Embedding {
        let mut batch = self.embed_batch(&[text]).await;
        batch
            .pop()
            .unwrap_or_else(|| Embedding::degraded(DEFAULT_EMBEDDING_DIM, "no embedding produced"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Vec<Embedding> {
        if texts.is_empty() {
            return Vec::new();
        }
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        match self.embed_many(owned).await {
            Ok(vectors) if vectors.len() == texts.len() => {
                vectors.into_iter().map(Embedding::ok).collect()
            }
            Ok(vectors) => degrade_all(
                texts.len(),
                format!("model returned {} vectors for {} inputs", vectors.len(), texts.len()),
            ),
            Err(err) => degrade_all(texts.len(), format!("{err:#}")),
        }
    }

    fn dimension(&self) -> usize {
        DEFAULT_EMBEDDING_DIM
    }

    fn model_name(&self) -> &str {
        LOCAL_MODEL_NAME
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Local
    }
}

fn degrade_all(count: usize, reason: String) -> Vec<Embedding> {
    warn!(%reason, count, "local embedding failed; using zero vectors");
    (0..count)
        .map(|_| Embedding::degraded(DEFAULT_EMBEDDING_DIM, reason.clone()))
        .collect()
}
