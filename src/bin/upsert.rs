use std::path::PathBuf;

use anyhow::{Context, Result};
use citecrawl::config::{load_dotenv, EmbeddingArgs, LogArgs, PineconeArgs};
use citecrawl::corpus::{read_corpus, MERGED_FILE};
use citecrawl::ingest::{upsert_papers, DEFAULT_UPSERT_BATCH};
use citecrawl::{PineconeIndex, VectorIndex};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "citecrawl-upsert",
    about = "Embed the scraped paper corpus and upsert it into the Pinecone index"
)]
struct UpsertCli {
    /// Directory holding all_papers.json
    #[arg(long, env = "CITECRAWL_DATA_DIR", default_value = "datastorage")]
    data_dir: PathBuf,

    /// Explicit corpus file; overrides --data-dir
    #[arg(long)]
    input: Option<PathBuf>,

    /// Records sent per upsert call
    #[arg(long, env = "CITECRAWL_UPSERT_BATCH", default_value_t = DEFAULT_UPSERT_BATCH)]
    batch_size: usize,

    #[command(flatten)]
    pinecone: PineconeArgs,

    #[command(flatten)]
    embedding: EmbeddingArgs,

    #[command(flatten)]
    log: LogArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv()?;
    let cli = UpsertCli::parse();
    cli.log.init();

    let input = cli
        .input
        .clone()
        .unwrap_or_else(|| cli.data_dir.join(MERGED_FILE));
    let papers =
        read_corpus(&input).with_context(|| format!("failed to load corpus {:?}", input))?;
    if papers.is_empty() {
        println!("No papers in {}; nothing to do.", input.display());
        return Ok(());
    }

    let index = PineconeIndex::connect(&cli.pinecone.to_config())
        .await
        .context("failed to connect to Pinecone")?;
    let embedder = cli.embedding.build()?;
    if !embedder.is_configured() {
        warn!("embedding backend is not configured; every paper will be skipped");
    }
    info!(
        papers = papers.len(),
        index = index.name(),
        model = embedder.model_name(),
        batch_size = cli.batch_size,
        "upserting corpus"
    );

    let report = upsert_papers(&papers, embedder.as_ref(), &index, cli.batch_size)
        .await
        .context("upsert failed")?;
    println!(
        "Upserted {} papers in {} batches into '{}' ({} skipped with degraded embeddings)",
        report.upserted,
        report.batches,
        index.name(),
        report.skipped_degraded
    );
    Ok(())
}
