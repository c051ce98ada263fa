//! In-process semantic index for tests and demos.

use async_trait::async_trait;
use rig::embeddings::{Embedding, EmbeddingModel};
use tokio::sync::RwLock;

use super::VectorIndex;
use crate::types::{Chunk, RagError};

/// Cosine-similarity store kept entirely in memory.
///
/// Behaves like [`super::SqliteChunkStore`] at the [`VectorIndex`] boundary
/// but keeps rows in a `Vec`, which makes it the fake-index seam for unit
/// and integration tests. Nothing about it is test-only; small corpora can
/// use it in production when persistence across restarts is not needed.
pub struct MemoryChunkStore<E>
where
    E: EmbeddingModel,
{
    model: E,
    rows: RwLock<Vec<(Chunk, Vec<f64>)>>,
}

impl<E> MemoryChunkStore<E>
where
    E: EmbeddingModel,
{
    pub fn new(model: E) -> Self {
        Self {
            model,
            rows: RwLock::new(Vec::new()),
        }
    }

    async fn embed_batches(&self, texts: Vec<String>) -> Result<Vec<Embedding>, RagError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        let batch_size = E::MAX_DOCUMENTS.max(1);
        for batch in texts.chunks(batch_size) {
            let embedded = self
                .model
                .embed_texts(batch.to_vec())
                .await
                .map_err(|err| RagError::Embedding(err.to_string()))?;
            embeddings.extend(embedded);
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl<E> VectorIndex for MemoryChunkStore<E>
where
    E: EmbeddingModel + Send + Sync,
{
    async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<(), RagError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embed_batches(texts).await?;

        let mut rows = self.rows.write().await;
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            rows.push((chunk, embedding.vec));
        }
        Ok(())
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<Chunk>, RagError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let rows = self.rows.read().await;
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = self
            .model
            .embed_text(text)
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?
            .vec;

        let mut scored: Vec<(f64, &Chunk)> = rows
            .iter()
            .map(|(chunk, embedding)| (cosine_similarity(&query_vec, embedding), chunk))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, chunk)| chunk.clone())
            .collect())
    }

    async fn delete_all(&self) -> Result<usize, RagError> {
        let mut rows = self.rows.write().await;
        let deleted = rows.len();
        rows.clear();
        Ok(deleted)
    }

    async fn count(&self) -> Result<usize, RagError> {
        Ok(self.rows.read().await.len())
    }
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
