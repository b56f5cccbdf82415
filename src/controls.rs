//! Crawl pagination and throttle controls shared by the scraper binary and the API.

use clap::Args;
use std::time::Duration;

/// arXiv search endpoint root.
pub const DEFAULT_ARXIV_BASE: &str = "https://arxiv.org";

/// Results requested per search page.
pub const RESULTS_PER_PAGE: usize = 50;

/// Default exclusive upper bound on the result offset per keyword.
pub const DEFAULT_MAX_RESULTS: usize = 200;

/// Keywords crawled when none are given on the command line.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "machine learning",
    "deep learning",
    "artificial intelligence",
    "data science",
    "computer vision",
    "natural language processing",
    "reinforcement learning",
    "supervised learning",
    "unsupervised learning",
    "transfer learning",
    "representation learning",
    "semi-supervised learning",
    "speech recognition",
    "image processing",
    "object detection",
    "generative models",
    "recommender systems",
    "anomaly detection",
    "time series forecasting",
    "robotics",
    "bioinformatics",
    "medical imaging",
    "large language models",
    "generative adversarial networks",
    "graph neural networks",
    "explainable AI",
    "federated learning",
    "self-supervised learning",
    "multi-modal learning",
    "edge AI",
    "AI ethics",
    "pattern recognition",
    "feature selection",
    "dimensionality reduction",
    "clustering",
    "classification",
    "regression",
    "optimization",
    "neural networks",
    "convolutional neural networks",
    "recurrent neural networks",
    "transformers",
];

/// Tunable knobs that bound crawl behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrawlControls {
    base_url: String,
    page_size: usize,
    max_results_per_keyword: usize,
    politeness_delay: Duration,
    request_timeout: Duration,
}

impl CrawlControls {
    /// Constructs a new set of crawl controls.
    pub fn new(
        base_url: impl Into<String>,
        max_results_per_keyword: usize,
        politeness_delay: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size: RESULTS_PER_PAGE,
            max_results_per_keyword,
            politeness_delay,
            request_timeout,
        }
    }

    /// Root URL the `/search/` path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Results per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Exclusive upper bound on page offsets.
    pub fn max_results_per_keyword(&self) -> usize {
        self.max_results_per_keyword
    }

    /// Time to wait between successive page requests.
    pub fn politeness_delay(&self) -> Duration {
        self.politeness_delay
    }

    /// Per-request transport timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Offsets requested for one keyword: `0, page_size, ...` below the maximum.
    pub fn page_offsets(&self) -> impl Iterator<Item = usize> {
        (0..self.max_results_per_keyword).step_by(self.page_size.max(1))
    }

    /// Builder-style override of the base URL, used to point at mirrors or fakes.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for CrawlControls {
    fn default() -> Self {
        Self::new(
            DEFAULT_ARXIV_BASE,
            DEFAULT_MAX_RESULTS,
            Duration::ZERO,
            Duration::from_secs(30),
        )
    }
}

/// Crawl flags flattened into binaries that run the crawler.
#[derive(Args, Debug, Clone)]
pub struct CrawlArgs {
    /// arXiv root URL
    #[arg(long, env = "CITECRAWL_ARXIV_BASE", default_value = DEFAULT_ARXIV_BASE)]
    pub arxiv_base_url: String,

    /// Exclusive upper bound on the result offset per keyword
    #[arg(long, env = "CITECRAWL_MAX_RESULTS", default_value_t = DEFAULT_MAX_RESULTS)]
    pub max_results_per_keyword: usize,

    /// Milliseconds to wait between page requests
    #[arg(long, env = "CITECRAWL_POLITENESS_MS", default_value_t = 0)]
    pub politeness_ms: u64,

    /// Seconds before a page request times out
    #[arg(long, env = "CITECRAWL_FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,
}

impl CrawlArgs {
    /// Converts the parsed flags into `CrawlControls`.
    pub fn build_controls(&self) -> CrawlControls {
        CrawlControls::new(
            self.arxiv_base_url.clone(),
            self.max_results_per_keyword,
            Duration::from_millis(self.politeness_ms),
            Duration::from_secs(self.fetch_timeout_secs.max(1)),
        )
    }
}
