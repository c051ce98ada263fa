//! Splits normalized documents into overlapping fixed-size passages.

use serde::{Deserialize, Serialize};

use crate::normalize::normalize;
use crate::types::{Chunk, Document};

/// Configuration for the fixed-size chunker.
///
/// Sizes are measured in characters. Consecutive chunks from the same
/// document share `overlap` characters of context so that statements cut by
/// a boundary stay retrievable from at least one side.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

impl ChunkerConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        debug_assert!(
            overlap < chunk_size,
            "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
        );
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Step between consecutive chunk starts. Clamped to at least one
    /// character so a misconfigured overlap cannot stall the walk.
    fn stride(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap).max(1)
    }
}

/// Normalizes each document and splits it into overlapping chunks.
///
/// Output is a flat, order-preserving sequence across all input documents.
/// Deterministic given the same input and configuration. Documents whose
/// normalized text is empty contribute no chunks.
pub fn split_documents(documents: &[Document], config: &ChunkerConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for document in documents {
        let text = normalize(&document.text);
        if text.is_empty() {
            continue;
        }
        for (ordinal, piece) in split_text(&text, config).into_iter().enumerate() {
            chunks.push(Chunk::new(document.source.clone(), ordinal, piece));
        }
    }
    chunks
}

/// Cuts `text` into windows of at most `chunk_size` characters advancing by
/// `chunk_size - overlap`. Cuts always land on char boundaries.
fn split_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    let boundaries: Vec<usize> = text.char_indices().map(|(idx, _)| idx).collect();
    let total_chars = boundaries.len();
    if total_chars <= config.chunk_size {
        return vec![text.to_string()];
    }

    let stride = config.stride();
    let mut pieces = Vec::new();
    let mut start = 0usize;
    while start < total_chars {
        let end = (start + config.chunk_size).min(total_chars);
        let byte_start = boundaries[start];
        let byte_end = if end == total_chars {
            text.len()
        } else {
            boundaries[end]
        };
        pieces.push(text[byte_start..byte_end].to_string());
        if end == total_chars {
            break;
        }
        start += stride;
    }
    pieces
}
