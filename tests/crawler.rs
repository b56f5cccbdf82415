mod common;

use std::time::Duration;

use citecrawl::corpus::read_corpus;
use citecrawl::{ArxivCrawler, CorpusPaths, CrawlControls};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{empty_page, results_page};

fn controls(server: &MockServer, max_results: usize) -> CrawlControls {
    CrawlControls::new(
        server.uri(),
        max_results,
        Duration::ZERO,
        Duration::from_secs(5),
    )
}

async fn mount_page(server: &MockServer, keyword: &str, start: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("query", keyword))
        .and(query_param("searchtype", "all"))
        .and(query_param("source", "header"))
        .and(query_param("start", start))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn follows_pages_until_an_empty_one() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "graph neural networks",
        "0",
        results_page(&[("2401.00001", "Graph Attention"), ("2401.00002", "Message Passing")]),
    )
    .await;
    mount_page(
        &server,
        "graph neural networks",
        "50",
        results_page(&[("2401.00003", "Over-smoothing in  GNNs")]),
    )
    .await;
    mount_page(&server, "graph neural networks", "100", empty_page()).await;

    let crawler = ArxivCrawler::new(controls(&server, 200)).expect("crawler");
    let report = crawler.crawl(&["graph neural networks"]).await;

    let titles: Vec<&str> = report.papers.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Graph Attention", "Message Passing", "Over-smoothing in GNNs"]
    );
    assert_eq!(report.papers[2].link, "https://arxiv.org/abs/2401.00003");
    assert!(report
        .papers
        .iter()
        .all(|p| p.source == "arXiv" && p.keyword == "graph neural networks"));
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.pages_failed, 0);
}

#[tokio::test]
async fn empty_first_page_issues_exactly_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(empty_page()))
        .expect(1)
        .mount(&server)
        .await;

    let crawler = ArxivCrawler::new(controls(&server, 200)).expect("crawler");
    let report = crawler.crawl(&["nothing here"]).await;

    assert!(report.papers.is_empty());
    assert_eq!(report.pages_fetched, 1);
}

#[tokio::test]
async fn failed_page_is_skipped_and_crawl_continues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "robotics",
        "50",
        results_page(&[("2402.00010", "Legged Locomotion")]),
    )
    .await;

    // Maximum of 100 means offsets 0 and 50 only.
    let crawler = ArxivCrawler::new(controls(&server, 100)).expect("crawler");
    let report = crawler.crawl(&["robotics"]).await;

    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.papers.len(), 1);
    assert_eq!(report.papers[0].title, "Legged Locomotion");
}

#[tokio::test]
async fn keywords_are_crawled_in_order() {
    let server = MockServer::start().await;
    mount_page(&server, "b", "0", results_page(&[("2", "Beta")])).await;
    mount_page(&server, "a", "0", results_page(&[("1", "Alpha")])).await;

    let crawler = ArxivCrawler::new(controls(&server, 50)).expect("crawler");
    let report = crawler.crawl(&["a", "b"]).await;

    let keywords: Vec<&str> = report.papers.iter().map(|p| p.keyword.as_str()).collect();
    assert_eq!(keywords, vec!["a", "b"]);
}

#[tokio::test]
async fn crawl_to_disk_writes_both_artifacts() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "transformers",
        "0",
        results_page(&[("1706.03762", "Attention Is All You Need")]),
    )
    .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let paths = CorpusPaths::in_dir(dir.path().join("datastorage"));
    let crawler = ArxivCrawler::new(controls(&server, 50)).expect("crawler");
    let report = crawler
        .crawl_to_disk(&["transformers"], &paths)
        .await
        .expect("crawl");

    let raw = read_corpus(&paths.raw).expect("raw artifact");
    let merged = read_corpus(&paths.merged).expect("merged artifact");
    assert_eq!(raw, report.papers);
    assert_eq!(merged, report.papers);
    assert_eq!(merged[0].title, "Attention Is All You Need");
}
