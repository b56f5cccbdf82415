//! Hugging Face Inference API embedding client.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Embedding, EmbeddingBackend, EmbeddingProvider};

/// Feature-extraction pipeline for `all-MiniLM-L6-v2`.
pub const DEFAULT_HF_ENDPOINT: &str = "https://api-inference.huggingface.co/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2";

/// Model identifier reported by the remote backend.
pub const DEFAULT_HF_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Request timeout for a single inference call.
pub const DEFAULT_HF_TIMEOUT: Duration = Duration::from_secs(10);

/// Embeddings client for a hosted feature-extraction endpoint.
///
/// Without an API key the client still answers, but every embedding is degraded.
#[derive(Clone)]
pub struct HuggingFaceEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    configured: bool,
}

impl HuggingFaceEmbedder {
    /// Builds a new client. `api_key` of `None` (or blank) yields an unconfigured client.
    pub fn new(
        api_key: Option<String>,
        endpoint: String,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self> {
        anyhow::ensure!(dimension > 0, "embedding dimension must be positive");
        anyhow::ensure!(
            endpoint.starts_with("http://") || endpoint.starts_with("https://"),
            "Hugging Face endpoint must be an http(s) URL"
        );
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(key) = &api_key {
            let auth = format!("Bearer {}", key.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth).context("invalid Hugging Face API key")?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Hugging Face HTTP client")?;
        if api_key.is_none() {
            warn!("no Hugging Face API key configured; query embeddings will be degraded");
        }
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: DEFAULT_HF_MODEL.to_string(),
            dimension,
            configured: api_key.is_some(),
        })
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        anyhow::ensure!(self.configured, "no Hugging Face API key configured");
        let request = InferenceRequest {
            inputs: text,
            options: InferenceOptions {
                wait_for_model: true,
            },
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context("Hugging Face request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("Hugging Face inference failed ({}): {}", status, body);
        }
        let payload: InferenceResponse = response
            .json()
            .await
            .context("failed to parse Hugging Face embedding response")?;
        let values = payload.into_vector()?;
        anyhow::ensure!(
            values.len() == self.dimension,
            "Hugging Face returned {} dimensions, expected {}",
            values.len(),
            self.dimension
        );
        Ok(values)
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbedder {
    async fn embed(&self, text: &str) -> Embedding {
        match self.request_embedding(text).await {
            Ok(values) => Embedding::ok(values),
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(%reason, "embedding generation failed; using zero vector");
                Embedding::degraded(self.dimension, reason)
            }
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Remote
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    options: InferenceOptions,
}

#[derive(Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

/// The endpoint answers with either a flat vector or a one-element list of vectors.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Flat(Vec<f32>),
    Nested(Vec<Vec<f32>>),
}

impl InferenceResponse {
    fn into_vector(self) -> Result<Vec<f32>> {
        match self {
            Self::Flat(values) if !values.is_empty() => Ok(values),
            Self::Nested(mut rows) if !rows.is_empty() => Ok(rows.swap_remove(0)),
            _ => Err(anyhow!("Hugging Face response missing embedding payload")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<f32>> {
        let payload: InferenceResponse = serde_json::from_str(json)?;
        payload.into_vector()
    }

    #[test]
    fn flat_vector_is_accepted() {
        assert_eq!(parse("[0.5, -0.25]").expect("flat"), vec![0.5, -0.25]);
    }

    #[test]
    fn single_nested_vector_is_unwrapped() {
        assert_eq!(parse("[[1.0, 2.0]]").expect("nested"), vec![1.0, 2.0]);
    }

    #[test]
    fn empty_payload_is_malformed() {
        assert!(parse("[]").is_err());
    }

    #[test]
    fn token_level_output_is_malformed() {
        assert!(parse("[[[1.0]]]").is_err());
    }

    #[tokio::test]
    async fn missing_key_degrades_without_network() {
        let embedder = HuggingFaceEmbedder::new(
            None,
            "http://127.0.0.1:9".to_string(),
            8,
            Duration::from_millis(50),
        )
        .expect("client");
        assert!(!embedder.is_configured());

        let embedding = embedder.embed("anything").await;
        assert!(embedding.is_degraded());
        assert_eq!(embedding.values, vec![0.0; 8]);
    }
}
