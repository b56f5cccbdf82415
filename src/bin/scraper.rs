use std::path::PathBuf;

use anyhow::{Context, Result};
use citecrawl::config::{load_dotenv, LogArgs};
use citecrawl::controls::{CrawlArgs, DEFAULT_KEYWORDS};
use citecrawl::{ArxivCrawler, CorpusPaths};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "citecrawl-scraper",
    about = "Crawl arXiv search results for a keyword list and write the paper corpus"
)]
struct ScraperCli {
    /// Keywords to search; the built-in research-topic list is used when omitted
    keywords: Vec<String>,

    /// Directory that receives arxiv.json and all_papers.json
    #[arg(long, env = "CITECRAWL_DATA_DIR", default_value = "datastorage")]
    data_dir: PathBuf,

    #[command(flatten)]
    crawl: CrawlArgs,

    #[command(flatten)]
    log: LogArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv()?;
    let cli = ScraperCli::parse();
    cli.log.init();

    let keywords: Vec<String> = if cli.keywords.is_empty() {
        DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
    } else {
        cli.keywords
    };
    let controls = cli.crawl.build_controls();
    info!(
        keywords = keywords.len(),
        max_results = controls.max_results_per_keyword(),
        base = controls.base_url(),
        "starting crawl"
    );

    let crawler = ArxivCrawler::new(controls).context("failed to build crawler")?;
    let paths = CorpusPaths::in_dir(&cli.data_dir);
    let report = crawler
        .crawl_to_disk(&keywords, &paths)
        .await
        .context("crawl failed")?;

    println!(
        "Scraped {} papers ({} pages fetched, {} pages failed) into {}",
        report.papers.len(),
        report.pages_fetched,
        report.pages_failed,
        paths.merged.display()
    );
    Ok(())
}
