//! SQLite-backed semantic index using `rig-sqlite` and the `sqlite-vec`
//! extension.

use async_trait::async_trait;
use rig::OneOrMany;
use rig::embeddings::{Embedding, EmbeddingModel};
use rig_sqlite::{Column, ColumnValue, SqliteVectorStore, SqliteVectorStoreTable};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::OnceLock;
use tokio_rusqlite::{Connection, ffi};
use uuid::Uuid;

use super::VectorIndex;
use crate::types::{Chunk, RagError};

/// Row shape persisted for each chunk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRow {
    pub id: String,
    pub source: String,
    #[serde(deserialize_with = "deserialize_ordinal")]
    pub ordinal: usize,
    pub content: String,
}

impl SqliteVectorStoreTable for ChunkRow {
    fn name() -> &'static str {
        "chunks"
    }

    fn schema() -> Vec<Column> {
        vec![
            Column::new("id", "TEXT PRIMARY KEY"),
            Column::new("source", "TEXT").indexed(),
            Column::new("ordinal", "TEXT"),
            Column::new("content", "TEXT"),
        ]
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn column_values(&self) -> Vec<(&'static str, Box<dyn ColumnValue>)> {
        vec![
            ("id", Box::new(self.id.clone())),
            ("source", Box::new(self.source.clone())),
            ("ordinal", Box::new(self.ordinal.to_string())),
            ("content", Box::new(self.content.clone())),
        ]
    }
}

impl From<Chunk> for ChunkRow {
    fn from(chunk: Chunk) -> Self {
        Self {
            id: chunk.id.to_string(),
            source: chunk.source,
            ordinal: chunk.ordinal,
            content: chunk.text,
        }
    }
}

impl From<ChunkRow> for Chunk {
    fn from(row: ChunkRow) -> Self {
        Chunk {
            id: Uuid::parse_str(&row.id).unwrap_or_else(|_| Uuid::new_v4()),
            source: row.source,
            ordinal: row.ordinal,
            text: row.content,
        }
    }
}

// Ordinals are stored as TEXT; accept both representations on the way out.
fn deserialize_ordinal<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(u64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Num(value) => usize::try_from(value)
            .map_err(|_| de::Error::custom(format!("ordinal {value} does not fit in usize"))),
        Repr::Text(text) => text
            .parse::<usize>()
            .map_err(|err| de::Error::custom(format!("unable to parse ordinal '{text}': {err}"))),
    }
}

/// Persistent vector store over a local SQLite database.
///
/// The embedding model is consulted twice: in batches when chunks are added,
/// and once per query to embed the question text. Similarity search runs as a
/// direct `vec_distance_cosine` query against the embeddings table.
#[derive(Clone)]
pub struct SqliteChunkStore<E>
where
    E: EmbeddingModel + 'static,
{
    inner: SqliteVectorStore<E, ChunkRow>,
    model: E,
    /// Separate connection handle for direct queries not supported by
    /// rig-sqlite. This is a clone of the connection used by the inner store.
    conn: Connection,
}

impl<E> SqliteChunkStore<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    pub async fn open(path: impl AsRef<Path>, model: &E) -> Result<Self, RagError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        conn.call(|conn| {
            let result = conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0));
            match result {
                Ok(_) => Ok(()),
                Err(err) => Err(tokio_rusqlite::Error::Rusqlite(err)),
            }
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;
        let conn_for_queries = conn.clone();
        let store = SqliteVectorStore::new(conn, model)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Ok(Self {
            inner: store,
            model: model.clone(),
            conn: conn_for_queries,
        })
    }

    fn register_sqlite_vec() -> Result<(), RagError> {
        static INIT: OnceLock<Result<(), String>> = OnceLock::new();

        INIT.get_or_init(|| unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *mut c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn: SqliteExtensionInit =
                transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc != 0 {
                Err(format!(
                    "failed to register sqlite-vec extension (code {rc})"
                ))
            } else {
                Ok(())
            }
        })
        .clone()
        .map_err(RagError::Storage)
    }

    /// Get the underlying connection for direct queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
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

    async fn search_similar(
        &self,
        query_embedding: Vec<f64>,
        top_k: usize,
    ) -> Result<Vec<Chunk>, RagError> {
        let embedding_json = serde_json::to_string(&query_embedding)
            .map_err(|err| RagError::Storage(err.to_string()))?;

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT c.id, c.source, c.ordinal, c.content, \
                         vec_distance_cosine(e.embedding, vec_f32(?)) as distance \
                         FROM chunks c \
                         JOIN chunks_embeddings e ON c.id = e.id \
                         ORDER BY distance ASC \
                         LIMIT {}",
                        top_k
                    ))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let rows = stmt
                    .query_map([&embedding_json], |row| {
                        Ok(ChunkRow {
                            id: row.get(0)?,
                            source: row.get(1)?,
                            ordinal: row.get::<_, String>(2)?.parse().unwrap_or(0),
                            content: row.get(3)?,
                        })
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(Chunk::from(row.map_err(tokio_rusqlite::Error::Rusqlite)?));
                }
                Ok(results)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}

#[async_trait]
impl<E> VectorIndex for SqliteChunkStore<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<(), RagError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embed_batches(texts).await?;

        let rows: Vec<(ChunkRow, OneOrMany<Embedding>)> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| (ChunkRow::from(chunk), OneOrMany::one(embedding)))
            .collect();

        self.inner
            .add_rows(rows)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Ok(())
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<Chunk>, RagError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self
            .model
            .embed_text(text)
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;
        self.search_similar(embedding.vec, top_k).await
    }

    async fn delete_all(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let deleted = conn
                    .execute("DELETE FROM chunks", [])
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                conn.execute("DELETE FROM chunks_embeddings", [])
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(deleted)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::DeterministicEmbedding;
    use tempfile::tempdir;

    fn chunk(text: &str, ordinal: usize) -> Chunk {
        Chunk::new("test://doc", ordinal, text)
    }

    #[tokio::test]
    async fn add_query_and_delete_round_trip() {
        let dir = tempdir().unwrap();
        let model = DeterministicEmbedding::default();
        let store = SqliteChunkStore::open(dir.path().join("chunks.sqlite"), &model)
            .await
            .unwrap();

        store
            .add_chunks(vec![
                chunk("the capital of France is Paris", 0),
                chunk("rust ownership prevents data races", 1),
            ])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        let results = store
            .query("the capital of France is Paris", 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        // The deterministic model embeds identical text identically, so the
        // exact-match chunk must rank first.
        assert_eq!(results[0].text, "the capital of France is Paris");

        let deleted = store.delete_all().await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.query("anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_add_is_a_no_op() {
        let dir = tempdir().unwrap();
        let model = DeterministicEmbedding::default();
        let store = SqliteChunkStore::open(dir.path().join("empty.sqlite"), &model)
            .await
            .unwrap();
        store.add_chunks(Vec::new()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
