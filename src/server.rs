//! HTTP API: search, health, and on-demand scraping.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Query, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::corpus::{self, CorpusError, CorpusPaths, PaperRecord};
use crate::crawler::{ArxivCrawler, CrawlError};
use crate::search::{SearchError, SearchPage, SearchRequest, SearchService, DEFAULT_TOP_K};
use crate::vector_store::{IndexError, IndexStats};

const SERVICE_NAME: &str = "CiteCrawler API";

/// Shared handler state, built once at startup.
#[derive(Clone)]
pub struct AppState {
    search: SearchService,
    crawler: Arc<ArxivCrawler>,
    corpus: Arc<CorpusPaths>,
}

impl AppState {
    /// Bundles the startup-constructed services.
    pub fn new(search: SearchService, crawler: ArxivCrawler, corpus: CorpusPaths) -> Self {
        Self {
            search,
            crawler: Arc::new(crawler),
            corpus: Arc::new(corpus),
        }
    }
}

/// Builds the router with CORS and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/search", get(search_handler))
        .route("/health", get(health))
        .route("/scrape", get(scrape_handler))
        .route("/api/test", get(api_test))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Errors mapped onto HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid client input.
    #[error("{0}")]
    BadRequest(String),
    /// Required configuration is missing.
    #[error("{0}")]
    Unavailable(String),
    /// Requested artifact does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Upstream or internal failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }
        (
            status,
            Json(ErrorBody {
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidRequest(message) => Self::BadRequest(message),
            SearchError::Index(err) if err.is_configuration() => Self::Unavailable(err.to_string()),
            SearchError::Index(err) => Self::Internal(format!("Search failed: {err}")),
        }
    }
}

impl From<IndexError> for ApiError {
    fn from(err: IndexError) -> Self {
        SearchError::Index(err).into()
    }
}

impl From<CrawlError> for ApiError {
    fn from(err: CrawlError) -> Self {
        Self::Internal(format!("Scrape failed: {err}"))
    }
}

impl From<CorpusError> for ApiError {
    fn from(err: CorpusError) -> Self {
        match err {
            CorpusError::NotFound(_) => Self::NotFound("No data found.".to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "CiteCrawler API is running!",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "search": "/search?q=your_query&top_k=5&page=1",
            "health": "/health",
            "scrape": "/scrape?keywords=machine+learning",
            "test": "/api/test"
        },
        "status": "operational"
    }))
}

async fn api_test() -> Json<Value> {
    Json(json!({
        "response": "Test successful!",
        "service": SERVICE_NAME,
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Query string of `GET /search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    top_k: Option<i64>,
    page: Option<i64>,
    source: Option<String>,
}

impl SearchParams {
    fn into_request(self) -> Result<SearchRequest, ApiError> {
        let query = self
            .q
            .ok_or_else(|| ApiError::BadRequest("missing query parameter `q`".to_string()))?;
        let top_k = positive(self.top_k.unwrap_or(DEFAULT_TOP_K as i64), "top_k")?;
        let page = positive(self.page.unwrap_or(1), "page")?;
        Ok(SearchRequest::new(query, top_k, page, self.source)?)
    }
}

fn positive(value: i64, name: &str) -> Result<usize, ApiError> {
    usize::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| ApiError::BadRequest(format!("{name} must be a positive integer")))
}

async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchPage>, ApiError> {
    let request = params.into_request()?;
    let page = state.search.search(&request).await?;
    Ok(Json(page))
}

/// Body of `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `"healthy"` when the process answers.
    pub api: String,
    /// Whether the vector index answered a stats request.
    pub pinecone: bool,
    /// Whether the remote embedding backend has an API key.
    pub huggingface: bool,
    /// Configured embedding strategy.
    pub embedding_backend: String,
    /// Response time, ms since the Unix epoch.
    pub timestamp_epoch_ms: u64,
    /// Index statistics when reachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_stats: Option<IndexStats>,
    /// Why the index is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinecone_error: Option<String>,
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let embedder = state.search.embedder();
    let mut status = HealthStatus {
        api: "healthy".to_string(),
        pinecone: false,
        huggingface: embedder.is_configured(),
        embedding_backend: embedder.backend().to_string(),
        timestamp_epoch_ms: epoch_ms(),
        index_stats: None,
        pinecone_error: None,
    };
    let stats = match state.search.index().get() {
        Ok(index) => index.describe_stats().await,
        Err(err) => Err(err),
    };
    match stats {
        Ok(stats) => {
            status.pinecone = true;
            status.index_stats = Some(stats);
        }
        Err(err) => status.pinecone_error = Some(err.to_string()),
    }
    Json(status)
}

async fn scrape_handler(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Vec<PaperRecord>>, ApiError> {
    let keywords = keywords_from_query(raw.as_deref().unwrap_or_default());
    if keywords.is_empty() {
        return Err(ApiError::BadRequest(
            "at least one `keywords` parameter is required".to_string(),
        ));
    }
    info!(keywords = ?keywords, "scrape requested");
    state.crawler.crawl_to_disk(&keywords, &state.corpus).await?;
    let papers = corpus::read_corpus(&state.corpus.merged)?;
    Ok(Json(papers))
}

/// Collects every non-empty `keywords` value from a raw query string, in order.
pub fn keywords_from_query(raw: &str) -> Vec<String> {
    url::form_urlencoded::parse(raw.as_bytes())
        .filter(|(key, _)| key == "keywords")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
