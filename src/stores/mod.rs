//! Storage backends for the persistent semantic index.
//!
//! The [`VectorIndex`] trait is the narrow contract the retrieval core
//! depends on: add chunks durably, query by embedding similarity, wipe
//! everything. Embedding generation and nearest-neighbor search belong to
//! the backend; the core never reimplements them.
//!
//! ```text
//!                  ┌───────────────────┐
//!                  │ VectorIndex trait │
//!                  │   (async CRUD)    │
//!                  └─────────┬─────────┘
//!                            │
//!              ┌─────────────┴─────────────┐
//!              ▼                           ▼
//!      ┌───────────────┐           ┌───────────────┐
//!      │    SQLite     │           │   in-memory   │
//!      │  sqlite-vec   │           │ (tests/demos) │
//!      └───────────────┘           └───────────────┘
//! ```

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::types::{Chunk, RagError};

pub use memory::MemoryChunkStore;
pub use sqlite::SqliteChunkStore;

/// Contract between the retrieval core and the persistent semantic index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Persists chunk text plus embedding. The data is durable before this
    /// returns.
    async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<(), RagError>;

    /// Returns up to `top_k` chunks, nearest first by embedding similarity.
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<Chunk>, RagError>;

    /// Removes every stored chunk, returning how many were deleted.
    async fn delete_all(&self) -> Result<usize, RagError>;

    /// Number of chunks currently stored.
    async fn count(&self) -> Result<usize, RagError>;
}
