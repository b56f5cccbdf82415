//! Sentence-embedding backends.
//!
//! Every backend returns an [`Embedding`] of the configured dimension. When the
//! backend fails, the vector is all zeros and the status is
//! [`EmbeddingStatus::Degraded`], so callers always receive a correctly shaped
//! vector and can still tell it apart from a real one.

use std::fmt;

use async_trait::async_trait;
use clap::ValueEnum;

pub mod huggingface;
#[cfg(feature = "local-embeddings")]
pub mod local;

/// Dimension of `sentence-transformers/all-MiniLM-L6-v2`.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Whether an embedding came from the model or from the fallback path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingStatus {
    /// Produced by the model.
    Ok,
    /// Zero vector returned because the backend failed.
    Degraded {
        /// Why the backend failed.
        reason: String,
    },
}

/// Vector plus provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// Embedding values.
    pub values: Vec<f32>,
    /// Provenance of `values`.
    pub status: EmbeddingStatus,
}

impl Embedding {
    /// Wraps a model-produced vector.
    pub fn ok(values: Vec<f32>) -> Self {
        Self {
            values,
            status: EmbeddingStatus::Ok,
        }
    }

    /// Zero vector of `dimension` tagged with `reason`.
    pub fn degraded(dimension: usize, reason: impl Into<String>) -> Self {
        Self {
            values: vec![0.0; dimension],
            status: EmbeddingStatus::Degraded {
                reason: reason.into(),
            },
        }
    }

    /// True when the vector is the zero-vector fallback.
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, EmbeddingStatus::Degraded { .. })
    }
}

/// Embedding strategy selected at startup.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum EmbeddingBackend {
    /// Hosted Hugging Face inference endpoint.
    Remote,
    /// In-process fastembed model.
    Local,
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => f.write_str("remote"),
            Self::Local => f.write_str("local"),
        }
    }
}

/// Maps text to fixed-length vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds one text. Never fails; see [`EmbeddingStatus`].
    async fn embed(&self, text: &str) -> Embedding;

    /// Embeds several texts in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Vec<Embedding> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await);
        }
        out
    }

    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Model identifier, for logs and `/health`.
    fn model_name(&self) -> &str;

    /// Which strategy this provider implements.
    fn backend(&self) -> EmbeddingBackend;

    /// Whether the backend has what it needs to produce real vectors.
    fn is_configured(&self) -> bool {
        true
    }
}
