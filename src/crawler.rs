//! Keyword-driven arXiv search crawler.

use reqwest::Client;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::controls::CrawlControls;
use crate::corpus::{self, CorpusError, CorpusPaths, PaperRecord};
use crate::html::ResultExtractor;

const USER_AGENT: &str = concat!("citecrawl/", env!("CARGO_PKG_VERSION"));

/// Errors that abort a crawl run.
///
/// Individual page failures never surface here; they are counted in [`CrawlReport`].
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The HTTP client could not be built.
    #[error("failed to build crawl http client: {0}")]
    Client(#[from] reqwest::Error),
    /// The configured base URL is not a valid URL.
    #[error("invalid arXiv base url {url}: {source}")]
    BaseUrl {
        /// Configured value.
        url: String,
        /// Parse failure.
        source: url::ParseError,
    },
    /// Persisting the corpus failed.
    #[error(transparent)]
    Corpus(#[from] CorpusError),
}

/// Result of a crawl run.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Papers in keyword, page, item order.
    pub papers: Vec<PaperRecord>,
    /// Pages fetched and parsed successfully.
    pub pages_fetched: usize,
    /// Pages skipped because of a transport error or non-success status.
    pub pages_failed: usize,
}

/// What a single page request produced.
#[derive(Debug)]
enum PageOutcome {
    Items(Vec<PaperRecord>),
    Exhausted,
    Failed(String),
}

/// Fetches arXiv search pages and extracts paper records.
pub struct ArxivCrawler {
    client: Client,
    controls: CrawlControls,
    search_url: Url,
    extractor: ResultExtractor,
}

impl ArxivCrawler {
    /// Builds a crawler with its own HTTP client.
    pub fn new(controls: CrawlControls) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(controls.request_timeout())
            .build()?;
        let raw = format!("{}/search/", controls.base_url());
        let search_url = Url::parse(&raw).map_err(|source| CrawlError::BaseUrl {
            url: controls.base_url().to_string(),
            source,
        })?;
        Ok(Self {
            client,
            controls,
            search_url,
            extractor: ResultExtractor::new(),
        })
    }

    /// Controls this crawler was built with.
    pub fn controls(&self) -> &CrawlControls {
        &self.controls
    }

    /// Crawls every keyword in order and aggregates the results.
    pub async fn crawl<S: AsRef<str>>(&self, keywords: &[S]) -> CrawlReport {
        let mut report = CrawlReport::default();
        for keyword in keywords {
            self.crawl_keyword(keyword.as_ref(), &mut report).await;
        }
        info!(
            papers = report.papers.len(),
            pages_fetched = report.pages_fetched,
            pages_failed = report.pages_failed,
            "crawl complete"
        );
        report
    }

    /// Crawls `keywords` and overwrites both corpus artifacts with the result.
    pub async fn crawl_to_disk<S: AsRef<str>>(
        &self,
        keywords: &[S],
        paths: &CorpusPaths,
    ) -> Result<CrawlReport, CrawlError> {
        let report = self.crawl(keywords).await;
        corpus::write_artifacts(paths, &report.papers)?;
        info!(
            papers = report.papers.len(),
            path = %paths.merged.display(),
            "saved corpus"
        );
        Ok(report)
    }

    async fn crawl_keyword(&self, keyword: &str, report: &mut CrawlReport) {
        let mut first = true;
        for offset in self.controls.page_offsets() {
            if !first && !self.controls.politeness_delay().is_zero() {
                sleep(self.controls.politeness_delay()).await;
            }
            first = false;

            match self.fetch_page(keyword, offset).await {
                PageOutcome::Items(mut papers) => {
                    report.pages_fetched += 1;
                    info!(keyword, offset, items = papers.len(), "parsed result page");
                    report.papers.append(&mut papers);
                }
                PageOutcome::Exhausted => {
                    report.pages_fetched += 1;
                    debug!(keyword, offset, "no more results");
                    break;
                }
                PageOutcome::Failed(reason) => {
                    report.pages_failed += 1;
                    warn!(keyword, offset, %reason, "skipping result page");
                }
            }
        }
    }

    async fn fetch_page(&self, keyword: &str, offset: usize) -> PageOutcome {
        let url = self.page_url(keyword, offset);
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) => return PageOutcome::Failed(err.to_string()),
        };
        let status = response.status();
        if !status.is_success() {
            return PageOutcome::Failed(format!("http status {status}"));
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return PageOutcome::Failed(err.to_string()),
        };
        let papers: Vec<PaperRecord> = self
            .extractor
            .extract(&body)
            .into_iter()
            .map(|item| PaperRecord::arxiv(item.title, item.link, keyword))
            .collect();
        if papers.is_empty() {
            PageOutcome::Exhausted
        } else {
            PageOutcome::Items(papers)
        }
    }

    /// Search URL for one page of `keyword` results.
    pub fn page_url(&self, keyword: &str, offset: usize) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("query", keyword)
            .append_pair("searchtype", "all")
            .append_pair("source", "header")
            .append_pair("start", &offset.to_string());
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_encodes_keyword_and_offset() {
        let crawler = ArxivCrawler::new(CrawlControls::default()).expect("crawler");
        let url = crawler.page_url("graph neural networks", 50);
        assert_eq!(
            url.as_str(),
            "https://arxiv.org/search/?query=graph+neural+networks&searchtype=all&source=header&start=50"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let controls = CrawlControls::default().with_base_url("not a url");
        assert!(matches!(
            ArxivCrawler::new(controls),
            Err(CrawlError::BaseUrl { .. })
        ));
    }
}
