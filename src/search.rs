//! Query embedding, nearest-neighbor lookup, and local pagination.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::embedder::{EmbeddingProvider, EmbeddingStatus};
use crate::vector_store::{IndexError, IndexHandle, IndexMatch, IndexQuery, MAX_QUERY_TOP_K};

/// Results per page when the client does not say.
pub const DEFAULT_TOP_K: usize = 5;

/// Largest page size a client may request.
pub const MAX_TOP_K: usize = 50;

/// Extra candidates fetched beyond the requested page.
pub const CANDIDATE_SLACK: usize = 10;

/// Errors surfaced by [`SearchService::search`].
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request violated a parameter bound.
    #[error("{0}")]
    InvalidRequest(String),
    /// The vector index failed or is not configured.
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Validated search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    query: String,
    top_k: usize,
    page: usize,
    source: Option<String>,
}

impl SearchRequest {
    /// Validates `query` (non-empty), `top_k` (1..=50) and `page` (>= 1).
    pub fn new(
        query: impl Into<String>,
        top_k: usize,
        page: usize,
        source: Option<String>,
    ) -> Result<Self, SearchError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(SearchError::InvalidRequest(
                "query text must not be empty".to_string(),
            ));
        }
        if !(1..=MAX_TOP_K).contains(&top_k) {
            return Err(SearchError::InvalidRequest(format!(
                "top_k must be between 1 and {MAX_TOP_K}"
            )));
        }
        if page < 1 {
            return Err(SearchError::InvalidRequest(
                "page must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            query,
            top_k,
            page,
            source: source.filter(|s| !s.is_empty()),
        })
    }

    /// Query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Page size.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// One-based page number.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Optional source filter.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Slice of the candidate list this request covers.
    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.top_k, self.page)
    }
}

/// Half-open `[start, end)` slice of the ranked candidate list for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// First candidate on the page.
    pub start: usize,
    /// One past the last candidate on the page.
    pub end: usize,
}

impl PageWindow {
    /// Window for `page` (one-based) of `top_k` results.
    pub fn new(top_k: usize, page: usize) -> Self {
        let start = page.saturating_sub(1).saturating_mul(top_k);
        Self {
            start,
            end: start.saturating_add(top_k),
        }
    }

    /// Candidates to request from the index: the page plus slack, capped at the index limit.
    pub fn fetch_k(&self) -> usize {
        self.end.saturating_add(CANDIDATE_SLACK).min(MAX_QUERY_TOP_K)
    }

    /// Items of `ranked` that fall in this window, and whether any follow it.
    pub fn slice<T>(&self, ranked: Vec<T>) -> (Vec<T>, bool) {
        let has_more = self.end < ranked.len();
        let page = ranked
            .into_iter()
            .skip(self.start)
            .take(self.end - self.start)
            .collect();
        (page, has_more)
    }
}

/// One paper in a search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Index record id.
    pub id: String,
    /// Paper title.
    pub title: String,
    /// Paper link.
    pub link: String,
    /// Abstract, when the index stores one.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Source tag.
    pub source: String,
    /// Similarity score rounded to four decimals.
    pub score: f64,
    /// Corpus row of the paper.
    pub row_id: String,
}

impl SearchResult {
    /// Builds a result from an index match, defaulting missing metadata.
    pub fn from_match(m: IndexMatch) -> Self {
        let meta = &m.metadata;
        Self {
            title: text_field(meta, "title").unwrap_or_else(|| "No title".to_string()),
            link: text_field(meta, "link").unwrap_or_default(),
            abstract_text: text_field(meta, "abstract")
                .unwrap_or_else(|| "No abstract available".to_string()),
            source: text_field(meta, "source").unwrap_or_else(|| "unknown".to_string()),
            row_id: text_field(meta, "row_id").unwrap_or_default(),
            score: round_score(m.score),
            id: m.id,
        }
    }
}

/// One page of search results.
///
/// `total` and `has_more` describe the fetched candidate window, at most
/// [`MAX_QUERY_TOP_K`] matches, not the whole index. Deep pages can therefore
/// report `has_more = false` while the index still holds further matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Results on this page, best first.
    pub results: Vec<SearchResult>,
    /// Matches in the fetched window.
    pub total: usize,
    /// One-based page number.
    pub page: usize,
    /// Page size.
    pub top_k: usize,
    /// Query text echoed back.
    pub query: String,
    /// Whether the fetched window extends past this page.
    pub has_more: bool,
    /// True when the query vector is the zero-vector fallback.
    pub degraded: bool,
}

/// Embeds queries and pages through index matches.
#[derive(Clone)]
pub struct SearchService {
    embedder: Arc<dyn EmbeddingProvider>,
    index: IndexHandle,
}

impl SearchService {
    /// Wires an embedder and an index handle together.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: IndexHandle) -> Self {
        Self { embedder, index }
    }

    /// Embedding backend in use.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Index handle in use.
    pub fn index(&self) -> &IndexHandle {
        &self.index
    }

    /// Runs one search.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchPage, SearchError> {
        let index = self.index.get()?;
        let window = request.window();
        info!(
            query = request.query(),
            top_k = request.top_k(),
            page = request.page(),
            "search"
        );

        let embedding = self.embedder.embed(request.query()).await;
        if let EmbeddingStatus::Degraded { reason } = &embedding.status {
            warn!(%reason, "searching with degraded query embedding");
        }
        let degraded = embedding.is_degraded();

        let matches = index
            .query(&IndexQuery {
                vector: embedding.values,
                top_k: window.fetch_k(),
                source: request.source().map(str::to_string),
            })
            .await?;
        let ranked: Vec<SearchResult> = matches.into_iter().map(SearchResult::from_match).collect();
        let total = ranked.len();
        let (results, has_more) = window.slice(ranked);
        info!(total, returned = results.len(), "search complete");

        Ok(SearchPage {
            results,
            total,
            page: request.page(),
            top_k: request.top_k(),
            query: request.query().to_string(),
            has_more,
            degraded,
        })
    }
}

fn text_field(meta: &Map<String, Value>, key: &str) -> Option<String> {
    match meta.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        _ => None,
    }
}

fn round_score(score: f32) -> f64 {
    (f64::from(score) * 10_000.0).round() / 10_000.0
}
