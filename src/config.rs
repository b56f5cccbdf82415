//! Environment-backed settings shared by the binaries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::embedder::huggingface::{HuggingFaceEmbedder, DEFAULT_HF_ENDPOINT, DEFAULT_HF_TIMEOUT};
use crate::embedder::{EmbeddingBackend, EmbeddingProvider, DEFAULT_EMBEDDING_DIM};
use crate::vector_store::{PineconeConfig, DEFAULT_CONTROLLER_URL, DEFAULT_INDEX_NAME};

/// Pinecone connection flags.
#[derive(Args, Debug, Clone)]
pub struct PineconeArgs {
    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pub pinecone_api_key: Option<String>,

    /// Name of the Pinecone index
    #[arg(long, env = "INDEX_NAME", default_value = DEFAULT_INDEX_NAME)]
    pub index_name: String,

    /// Data-plane host; looked up from the control plane when omitted
    #[arg(long, env = "PINECONE_INDEX_HOST")]
    pub index_host: Option<String>,

    /// Pinecone control-plane URL
    #[arg(long, env = "PINECONE_CONTROLLER_URL", default_value = DEFAULT_CONTROLLER_URL)]
    pub controller_url: String,
}

impl PineconeArgs {
    /// Converts the flags into a connection config.
    pub fn to_config(&self) -> PineconeConfig {
        let mut config = PineconeConfig::new(self.pinecone_api_key.clone(), self.index_name.clone())
            .with_controller_url(self.controller_url.clone());
        if let Some(host) = &self.index_host {
            config = config.with_host(host.clone());
        }
        config
    }
}

/// Embedding backend flags.
#[derive(Args, Debug, Clone)]
pub struct EmbeddingArgs {
    /// Embedding strategy
    #[arg(
        long,
        value_enum,
        env = "CITECRAWL_EMBEDDING_BACKEND",
        default_value_t = EmbeddingBackend::Remote
    )]
    pub embedding_backend: EmbeddingBackend,

    /// Hugging Face Inference API key (remote backend)
    #[arg(long, env = "HUGGINGFACE_API_KEY", hide_env_values = true)]
    pub huggingface_api_key: Option<String>,

    /// Feature-extraction endpoint (remote backend)
    #[arg(long, env = "CITECRAWL_HF_ENDPOINT", default_value = DEFAULT_HF_ENDPOINT)]
    pub hf_endpoint: String,

    /// Seconds before a remote embedding request times out
    #[arg(long, env = "CITECRAWL_HF_TIMEOUT_SECS", default_value_t = DEFAULT_HF_TIMEOUT.as_secs())]
    pub hf_timeout_secs: u64,

    /// Expected embedding dimension
    #[arg(long, env = "CITECRAWL_EMBEDDING_DIM", default_value_t = DEFAULT_EMBEDDING_DIM)]
    pub embedding_dim: usize,

    /// Model cache directory (local backend)
    #[arg(long, env = "CITECRAWL_MODEL_CACHE")]
    pub model_cache_dir: Option<PathBuf>,
}

impl EmbeddingArgs {
    /// Builds the configured backend.
    pub fn build(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.embedding_backend {
            EmbeddingBackend::Remote => {
                let embedder = HuggingFaceEmbedder::new(
                    self.huggingface_api_key.clone(),
                    self.hf_endpoint.clone(),
                    self.embedding_dim,
                    Duration::from_secs(self.hf_timeout_secs.max(1)),
                )?;
                Ok(Arc::new(embedder))
            }
            EmbeddingBackend::Local => self.build_local(),
        }
    }

    #[cfg(feature = "local-embeddings")]
    fn build_local(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        use crate::embedder::local::LocalEmbedder;

        anyhow::ensure!(
            self.embedding_dim == DEFAULT_EMBEDDING_DIM,
            "local model produces {} dimensions, configured {}",
            DEFAULT_EMBEDDING_DIM,
            self.embedding_dim
        );
        let embedder = LocalEmbedder::new(self.model_cache_dir.clone())?;
        Ok(Arc::new(embedder))
    }

    #[cfg(not(feature = "local-embeddings"))]
    fn build_local(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        anyhow::bail!("local embedding backend requires the `local-embeddings` feature")
    }
}

/// Logging flags.
#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// Default log filter; `RUST_LOG` takes precedence
    #[arg(long, env = "CITECRAWL_LOG", default_value = "info")]
    pub log_level: String,
}

impl LogArgs {
    /// Installs the global stderr subscriber.
    pub fn init(&self) {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(&self.log_level)),
            )
            .init();
    }
}

/// Loads `.env` from the working directory when present.
pub fn load_dotenv() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err).context("failed to read .env"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        pinecone: PineconeArgs,
        #[command(flatten)]
        embedding: EmbeddingArgs,
    }

    #[test]
    fn explicit_flags_build_config() {
        let cli = TestCli::try_parse_from([
            "test",
            "--pinecone-api-key",
            "pk",
            "--index-name",
            "other",
            "--index-host",
            "http://127.0.0.1:5080",
            "--embedding-backend",
            "remote",
            "--embedding-dim",
            "8",
        ])
        .expect("parse");
        let config = cli.pinecone.to_config();
        assert_eq!(config.api_key.as_deref(), Some("pk"));
        assert_eq!(config.index_name, "other");
        assert_eq!(config.host.as_deref(), Some("http://127.0.0.1:5080"));
        assert_eq!(cli.embedding.embedding_backend, EmbeddingBackend::Remote);

        let embedder = cli.embedding.build().expect("remote embedder");
        assert_eq!(embedder.dimension(), 8);
    }

    #[cfg(not(feature = "local-embeddings"))]
    #[test]
    fn local_backend_without_feature_is_a_config_error() {
        let cli = TestCli::try_parse_from(["test", "--embedding-backend", "local"]).expect("parse");
        assert!(cli.embedding.build().is_err());
    }
}
