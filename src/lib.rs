#![warn(missing_docs)]
//! Core library entry points for the citecrawl paper search pipeline.
//!
//! The crate is split along the pipeline: [`crawler`] scrapes arXiv into a
//! [`corpus`], [`ingest`] embeds and upserts that corpus into a
//! [`vector_store`], and [`server`] answers semantic queries through [`search`].

pub mod config;
pub mod controls;
pub mod corpus;
pub mod crawler;
pub mod embedder;
pub mod html;
pub mod ingest;
pub mod search;
pub mod server;
pub mod vector_store;

pub use controls::{CrawlArgs, CrawlControls};
pub use corpus::{CorpusError, CorpusPaths, PaperRecord};
pub use crawler::{ArxivCrawler, CrawlError, CrawlReport};
pub use embedder::{Embedding, EmbeddingBackend, EmbeddingProvider, EmbeddingStatus};
pub use ingest::{upsert_papers, IngestReport};
pub use search::{SearchError, SearchPage, SearchRequest, SearchResult, SearchService};
pub use server::{router, AppState};
pub use vector_store::{
    IndexError, IndexHandle, IndexMatch, IndexQuery, IndexStats, IndexedVector, PineconeConfig,
    PineconeIndex, VectorIndex, VectorMetadata,
};
