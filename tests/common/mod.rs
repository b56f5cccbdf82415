#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use citecrawl::{
    Embedding, EmbeddingBackend, EmbeddingProvider, IndexError, IndexMatch, IndexQuery,
    IndexStats, IndexedVector, VectorIndex,
};
use serde_json::Value;

pub const LETTER_DIM: usize = 26;

/// Letter-frequency embedder: deterministic and good enough to rank near-duplicate titles.
pub struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    async fn embed(&self, text: &str) -> Embedding {
        let mut values = vec![0.0; LETTER_DIM];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            values[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Embedding::ok(values)
    }

    fn dimension(&self) -> usize {
        LETTER_DIM
    }

    fn model_name(&self) -> &str {
        "letters"
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Local
    }
}

/// Brute-force cosine index kept in memory.
#[derive(Default)]
pub struct MemoryIndex {
    records: Mutex<Vec<IndexedVector>>,
}

impl MemoryIndex {
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, batch: &[IndexedVector]) -> Result<usize, IndexError> {
        let mut records = self.records.lock().unwrap();
        for vector in batch {
            records.retain(|existing| existing.id != vector.id);
            records.push(vector.clone());
        }
        Ok(batch.len())
    }

    async fn query(&self, query: &IndexQuery) -> Result<Vec<IndexMatch>, IndexError> {
        let records = self.records.lock().unwrap();
        let mut matches: Vec<IndexMatch> = records
            .iter()
            .filter(|r| {
                query
                    .source
                    .as_deref()
                    .map_or(true, |source| r.metadata.source == source)
            })
            .map(|r| IndexMatch {
                id: r.id.clone(),
                score: cosine(&query.vector, &r.values),
                metadata: match serde_json::to_value(&r.metadata) {
                    Ok(Value::Object(map)) => map,
                    _ => Default::default(),
                },
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(query.top_k);
        Ok(matches)
    }

    async fn describe_stats(&self) -> Result<IndexStats, IndexError> {
        Ok(IndexStats {
            total_vectors: self.len() as u64,
            dimension: LETTER_DIM,
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

/// arXiv search page markup with one `li.arxiv-result` per `(id, title)`.
pub fn results_page(items: &[(&str, &str)]) -> String {
    let entries: String = items
        .iter()
        .map(|(id, title)| {
            format!(
                r#"<li class="arxiv-result">
  <div class="is-marginless">
    <p class="list-title is-inline-block"><a href="https://arxiv.org/abs/{id}">arXiv:{id}</a>
      <span>&nbsp;[<a href="https://arxiv.org/pdf/{id}">pdf</a>]</span></p>
  </div>
  <p class="title is-5 mathjax">
      {title}
  </p>
</li>"#
            )
        })
        .collect();
    format!(
        r#"<!DOCTYPE html><html><body><main><ol class="breathe-horizontal" start="1">{entries}</ol></main></body></html>"#
    )
}

pub fn empty_page() -> String {
    results_page(&[])
}
