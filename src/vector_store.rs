//! Pinecone vector index client.
//!
//! The index is connected once at startup. A process started without the API key
//! still runs: it holds an [`IndexHandle::Unavailable`] that explains why every
//! index-backed request fails.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{error, info};

/// Index queried when `INDEX_NAME` is unset.
pub const DEFAULT_INDEX_NAME: &str = "papers-index";

/// Pinecone control-plane root.
pub const DEFAULT_CONTROLLER_URL: &str = "https://api.pinecone.io";

/// Largest `topK` a single query may request.
pub const MAX_QUERY_TOP_K: usize = 100;

const API_VERSION: &str = "2024-07";

/// Errors raised by vector index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No API key was configured.
    #[error("PINECONE_API_KEY not set")]
    MissingCredential,
    /// Configuration is present but unusable.
    #[error("invalid vector index configuration: {0}")]
    Config(String),
    /// The index could not be connected at startup.
    #[error("vector index unavailable: {0}")]
    Unavailable(String),
    /// Transport or decode failure.
    #[error("vector index request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success response.
    #[error("vector index returned {status}: {body}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },
}

impl IndexError {
    /// True for errors caused by configuration rather than a failed call.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential | Self::Config(_) | Self::Unavailable(_)
        )
    }
}

/// Validated index name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexName(String);

impl IndexName {
    /// Builds a new index identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, IndexError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(IndexError::Config("index name is required".to_string()));
        }
        Ok(Self(name))
    }

    /// Raw name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata stored alongside every paper vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorMetadata {
    /// Paper title.
    pub title: String,
    /// Paper link.
    pub link: String,
    /// Source tag, used by the `source` search filter.
    pub source: String,
    /// Crawl keyword that surfaced the paper.
    pub keyword: String,
    /// Position of the paper in the ingested corpus.
    pub row_id: String,
}

/// One record sent to the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedVector {
    /// Record id (`paper-{row}`).
    pub id: String,
    /// Embedding values.
    pub values: Vec<f32>,
    /// Stored metadata.
    pub metadata: VectorMetadata,
}

/// Similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    /// Query vector.
    pub vector: Vec<f32>,
    /// Number of neighbors requested.
    pub top_k: usize,
    /// Exact-match filter on the `source` metadata field.
    pub source: Option<String>,
}

/// One neighbor returned by a query, best first.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexMatch {
    /// Record id.
    pub id: String,
    /// Similarity score.
    #[serde(default)]
    pub score: f32,
    /// Stored metadata, possibly partial.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Summary statistics reported by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total stored vectors.
    pub total_vectors: u64,
    /// Vector dimension.
    pub dimension: usize,
}

/// Operations the search and ingestion paths need from a vector index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upserts one batch in a single call; returns the number of records accepted.
    async fn upsert(&self, batch: &[IndexedVector]) -> Result<usize, IndexError>;

    /// Nearest neighbors of `query.vector`, best first.
    async fn query(&self, query: &IndexQuery) -> Result<Vec<IndexMatch>, IndexError>;

    /// Current index statistics.
    async fn describe_stats(&self) -> Result<IndexStats, IndexError>;

    /// Index name for logs.
    fn name(&self) -> &str;
}

/// Connection settings for a Pinecone index.
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    /// API key; `None` makes [`PineconeIndex::connect`] fail with `MissingCredential`.
    pub api_key: Option<String>,
    /// Index to use.
    pub index_name: String,
    /// Data-plane host; resolved from the control plane when absent.
    pub host: Option<String>,
    /// Control-plane root.
    pub controller_url: String,
}

impl PineconeConfig {
    /// Settings for `index_name` with the default control plane.
    pub fn new(api_key: Option<String>, index_name: impl Into<String>) -> Self {
        Self {
            api_key,
            index_name: index_name.into(),
            host: None,
            controller_url: DEFAULT_CONTROLLER_URL.to_string(),
        }
    }

    /// Builder-style override of the data-plane host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Builder-style override of the control-plane root.
    pub fn with_controller_url(mut self, url: impl Into<String>) -> Self {
        self.controller_url = url.into();
        self
    }
}

/// Pinecone REST data-plane client.
#[derive(Clone)]
pub struct PineconeIndex {
    client: Client,
    name: IndexName,
    host_url: String,
}

impl PineconeIndex {
    /// Validates configuration, resolves the index host, and returns a ready client.
    pub async fn connect(config: &PineconeConfig) -> Result<Self, IndexError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(IndexError::MissingCredential)?;
        let name = IndexName::new(config.index_name.clone())?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(api_key)
                .map_err(|_| IndexError::Config("invalid Pinecone API key".to_string()))?,
        );
        headers.insert(
            "x-pinecone-api-version",
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(headers).build()?;

        let host = match config.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            Some(host) => host.to_string(),
            None => resolve_host(&client, &config.controller_url, &name).await?,
        };
        let host_url = host_url(&host);
        info!(index = %name, host = %host_url, "vector index connected");
        Ok(Self {
            client,
            name,
            host_url,
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, IndexError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.host_url, path);
        let response = self.client.post(url).json(body).send().await?;
        decode(response).await
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, batch: &[IndexedVector]) -> Result<usize, IndexError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let response: UpsertResponse = self
            .post("/vectors/upsert", &UpsertRequest { vectors: batch })
            .await?;
        Ok(response.upserted_count.unwrap_or(batch.len()))
    }

    async fn query(&self, query: &IndexQuery) -> Result<Vec<IndexMatch>, IndexError> {
        let request = QueryRequest {
            vector: &query.vector,
            top_k: query.top_k.clamp(1, MAX_QUERY_TOP_K),
            include_metadata: true,
            include_values: false,
            filter: query
                .source
                .as_deref()
                .map(|source| json!({ "source": { "$eq": source } })),
        };
        let response: QueryResponse = self.post("/query", &request).await?;
        Ok(response.matches)
    }

    async fn describe_stats(&self) -> Result<IndexStats, IndexError> {
        let response: StatsResponse = self.post("/describe_index_stats", &json!({})).await?;
        Ok(IndexStats {
            total_vectors: response.total_vector_count,
            dimension: response.dimension,
        })
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }
}

/// Either a connected index or the reason none is available.
#[derive(Clone)]
pub enum IndexHandle {
    /// Connected index.
    Ready(Arc<dyn VectorIndex>),
    /// Startup connection failed with this message.
    Unavailable(Arc<str>),
}

impl IndexHandle {
    /// Connects to Pinecone, logging loudly and keeping the reason on failure.
    pub async fn connect(config: &PineconeConfig) -> Self {
        match PineconeIndex::connect(config).await {
            Ok(index) => Self::Ready(Arc::new(index)),
            Err(err) => {
                error!(error = %err, "vector index not available; search and health will report it");
                Self::Unavailable(Arc::from(err.to_string()))
            }
        }
    }

    /// Wraps an already constructed index.
    pub fn ready(index: Arc<dyn VectorIndex>) -> Self {
        Self::Ready(index)
    }

    /// The connected index, or an error carrying the startup failure.
    pub fn get(&self) -> Result<&Arc<dyn VectorIndex>, IndexError> {
        match self {
            Self::Ready(index) => Ok(index),
            Self::Unavailable(reason) => Err(IndexError::Unavailable(reason.to_string())),
        }
    }
}

async fn resolve_host(
    client: &Client,
    controller_url: &str,
    name: &IndexName,
) -> Result<String, IndexError> {
    let url = format!(
        "{}/indexes/{}",
        controller_url.trim_end_matches('/'),
        name.as_str()
    );
    let response = client.get(url).send().await?;
    let description: IndexDescription = decode(response).await?;
    Ok(description.host)
}

async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, IndexError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        return Err(IndexError::Status { status, body });
    }
    Ok(response.json().await?)
}

fn host_url(host: &str) -> String {
    let trimmed = host.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexedVector],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<IndexMatch>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    total_vector_count: u64,
    #[serde(default)]
    dimension: usize,
}

#[derive(Deserialize)]
struct IndexDescription {
    host: String,
}
