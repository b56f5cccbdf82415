//! Corpus ingestion: embed paper titles and upsert them in bounded batches.

use tracing::{info, warn};

use crate::corpus::PaperRecord;
use crate::embedder::EmbeddingProvider;
use crate::vector_store::{IndexError, IndexedVector, VectorIndex, VectorMetadata};

/// Records sent per upsert call unless overridden.
pub const DEFAULT_UPSERT_BATCH: usize = 100;

/// Counters describing an ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Records accepted by the index.
    pub upserted: usize,
    /// Papers left out because their embedding was degraded.
    pub skipped_degraded: usize,
    /// Upsert calls issued.
    pub batches: usize,
}

/// Positional record id for the paper at `row`.
pub fn paper_id(row: usize) -> String {
    format!("paper-{row}")
}

/// Builds the index record for `paper` at corpus position `row`.
pub fn to_indexed_vector(row: usize, paper: &PaperRecord, values: Vec<f32>) -> IndexedVector {
    IndexedVector {
        id: paper_id(row),
        values,
        metadata: VectorMetadata {
            title: paper.title.clone(),
            link: paper.link.clone(),
            source: paper.source.clone(),
            keyword: paper.keyword.clone(),
            row_id: row.to_string(),
        },
    }
}

/// Embeds each paper title and upserts the corpus.
///
/// A batch is flushed when it reaches `batch_size` records or the corpus is
/// exhausted. Ids are positional, so re-running over a changed corpus can shift
/// or duplicate them.
pub async fn upsert_papers(
    papers: &[PaperRecord],
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    batch_size: usize,
) -> Result<IngestReport, IndexError> {
    let batch_size = batch_size.max(1);
    let mut report = IngestReport::default();
    let mut batch: Vec<IndexedVector> = Vec::with_capacity(batch_size);

    for (row, paper) in papers.iter().enumerate() {
        let embedding = embedder.embed(&paper.title).await;
        if embedding.is_degraded() {
            report.skipped_degraded += 1;
            warn!(row, title = %paper.title, "skipping paper with degraded embedding");
            continue;
        }
        batch.push(to_indexed_vector(row, paper, embedding.values));
        if batch.len() >= batch_size {
            flush(index, &mut batch, &mut report).await?;
            info!(processed = row + 1, upserted = report.upserted, "upserted papers");
        }
    }
    flush(index, &mut batch, &mut report).await?;

    info!(
        upserted = report.upserted,
        skipped = report.skipped_degraded,
        batches = report.batches,
        index = index.name(),
        "upsert complete"
    );
    Ok(report)
}

async fn flush(
    index: &dyn VectorIndex,
    batch: &mut Vec<IndexedVector>,
    report: &mut IngestReport,
) -> Result<(), IndexError> {
    if batch.is_empty() {
        return Ok(());
    }
    report.upserted += index.upsert(batch).await?;
    report.batches += 1;
    batch.clear();
    Ok(())
}
