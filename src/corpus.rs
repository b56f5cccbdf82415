//! Paper records emitted by the crawler and the JSON artifacts that hold them.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source tag stamped on every record produced by the arXiv crawler.
pub const ARXIV_SOURCE: &str = "arXiv";

/// File name of the raw per-source arXiv artifact.
pub const ARXIV_FILE: &str = "arxiv.json";

/// File name of the merged corpus consumed by ingestion and `/scrape`.
pub const MERGED_FILE: &str = "all_papers.json";

/// One scraped paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Paper title with whitespace collapsed.
    pub title: String,
    /// Absolute link to the paper's detail page.
    pub link: String,
    /// Tag naming the site the record was scraped from.
    pub source: String,
    /// Search keyword that surfaced the paper.
    pub keyword: String,
}

impl PaperRecord {
    /// Creates an arXiv-sourced record.
    pub fn arxiv(title: impl Into<String>, link: impl Into<String>, keyword: &str) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            source: ARXIV_SOURCE.to_string(),
            keyword: keyword.to_string(),
        }
    }
}

/// Errors raised while reading or writing corpus artifacts.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// The artifact has not been written yet.
    #[error("corpus file {0:?} not found")]
    NotFound(PathBuf),
    /// Filesystem failure.
    #[error("corpus io error on {path:?}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The artifact is not a JSON array of paper records.
    #[error("invalid corpus json in {path:?}: {source}")]
    Json {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Locations of the two artifacts a crawl run produces.
#[derive(Debug, Clone)]
pub struct CorpusPaths {
    /// Raw arXiv result list.
    pub raw: PathBuf,
    /// Merged corpus across all sources.
    pub merged: PathBuf,
}

impl CorpusPaths {
    /// Artifact paths rooted at `data_dir`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            raw: dir.join(ARXIV_FILE),
            merged: dir.join(MERGED_FILE),
        }
    }
}

impl Default for CorpusPaths {
    fn default() -> Self {
        Self::in_dir("datastorage")
    }
}

/// Writes `papers` as pretty-printed JSON, replacing any existing file.
pub fn write_corpus(path: &Path, papers: &[PaperRecord]) -> Result<(), CorpusError> {
    let io_err = |source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, papers).map_err(|source| CorpusError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.write_all(b"\n").map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}

/// Loads a corpus artifact.
pub fn read_corpus(path: &Path) -> Result<Vec<PaperRecord>, CorpusError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(CorpusError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(CorpusError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CorpusError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Persists the raw arXiv artifact and the merged corpus.
///
/// arXiv is the only source today, so the merged corpus is the arXiv list.
pub fn write_artifacts(paths: &CorpusPaths, arxiv: &[PaperRecord]) -> Result<(), CorpusError> {
    write_corpus(&paths.raw, arxiv)?;
    write_corpus(&paths.merged, arxiv)?;
    Ok(())
}
