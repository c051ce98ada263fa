//! In-memory keyword index over every chunk ingested since the last reset.

use bm25::{Document, Language, SearchEngine, SearchEngineBuilder};
use parking_lot::RwLock;

use crate::types::Chunk;

/// BM25-ranked keyword index.
///
/// The engine is always rebuilt from the entire accumulated chunk history
/// rather than merged incrementally: term and document frequencies depend on
/// the full corpus, so every ingestion triggers a full rebuild. The index has
/// no persisted layout; after a process restart it stays empty until the next
/// ingestion and retrieval degrades to semantic-only search.
#[derive(Default)]
pub struct LexicalIndex {
    state: RwLock<LexicalState>,
}

#[derive(Default)]
struct LexicalState {
    chunks: Vec<Chunk>,
    engine: Option<SearchEngine<u32>>,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `new_chunks` to the corpus and rebuilds the ranking engine
    /// over the whole history.
    pub fn extend(&self, new_chunks: Vec<Chunk>) {
        if new_chunks.is_empty() {
            return;
        }
        let mut state = self.state.write();
        state.chunks.extend(new_chunks);
        state.engine = Some(build_engine(&state.chunks));
    }

    /// Returns up to `k` chunks ranked by lexical relevance.
    ///
    /// An index that has never been built returns an empty sequence rather
    /// than failing, so the hybrid retriever can fall back to semantic-only
    /// search.
    pub fn query(&self, text: &str, k: usize) -> Vec<Chunk> {
        let state = self.state.read();
        let Some(engine) = state.engine.as_ref() else {
            return Vec::new();
        };
        engine
            .search(text, k)
            .into_iter()
            .filter_map(|result| state.chunks.get(result.document.id as usize).cloned())
            .collect()
    }

    /// Resets to empty/uninitialized.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.chunks.clear();
        state.engine = None;
    }

    pub fn len(&self) -> usize {
        self.state.read().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().chunks.is_empty()
    }
}

fn build_engine(chunks: &[Chunk]) -> SearchEngine<u32> {
    let documents: Vec<Document<u32>> = chunks
        .iter()
        .enumerate()
        .map(|(idx, chunk)| Document {
            id: idx as u32,
            contents: chunk.text.clone(),
        })
        .collect();
    SearchEngineBuilder::<u32>::with_documents(Language::English, documents).build()
}
