use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use citecrawl::config::{load_dotenv, EmbeddingArgs, LogArgs, PineconeArgs};
use citecrawl::{router, AppState, ArxivCrawler, CorpusPaths, CrawlArgs, IndexHandle, SearchService};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "citecrawl-api",
    about = "HTTP API for semantic paper search backed by Pinecone"
)]
struct ApiCli {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "CITECRAWL_BIND", default_value = "127.0.0.1:8000")]
    bind: String,

    /// Directory the /scrape endpoint writes the corpus to
    #[arg(long, env = "CITECRAWL_DATA_DIR", default_value = "datastorage")]
    data_dir: PathBuf,

    #[command(flatten)]
    pinecone: PineconeArgs,

    #[command(flatten)]
    embedding: EmbeddingArgs,

    #[command(flatten)]
    crawl: CrawlArgs,

    #[command(flatten)]
    log: LogArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv()?;
    let cli = ApiCli::parse();
    cli.log.init();

    let embedder = cli.embedding.build()?;
    let index = IndexHandle::connect(&cli.pinecone.to_config()).await;
    let crawler =
        ArxivCrawler::new(cli.crawl.build_controls()).context("failed to build crawler")?;
    let state = AppState::new(
        SearchService::new(embedder, index),
        crawler,
        CorpusPaths::in_dir(&cli.data_dir),
    );
    let app = router(state);

    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "citecrawl-api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server shutdown")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
