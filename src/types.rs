//! Core data model shared across the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A raw document handed to the engine by a loader.
///
/// Documents are consumed once: normalized, chunked, and then dropped.
/// Only the chunks survive ingestion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    /// Source-identifying metadata (URL or filename).
    pub source: String,
    /// Extracted text content, not yet normalized.
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// A bounded span of normalized document text.
///
/// Chunks are the atomic unit of indexing and retrieval and are immutable
/// once created. Re-ingesting the same source produces new chunk instances
/// rather than updating old ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    /// Source of the document this chunk was cut from.
    pub source: String,
    /// Zero-based position of this chunk within its document.
    pub ordinal: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(source: impl Into<String>, ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            ordinal,
            text: text.into(),
        }
    }
}

/// One prior exchange of a conversation, supplied per-request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user: String,
    pub assistant: String,
}

impl ConversationTurn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

/// Errors surfaced by the retrieval and ingestion pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("completion error: {0}")]
    Completion(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Io(err.to_string())
    }
}
