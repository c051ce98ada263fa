//! Merges lexical and semantic search results into one evidence list.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lexical::LexicalIndex;
use crate::stores::VectorIndex;
use crate::types::{Chunk, RagError};

/// Per-source fetch depths and the final evidence budget.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrieverConfig {
    pub k_lexical: usize,
    pub k_semantic: usize,
    pub k_final: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            k_lexical: 3,
            k_semantic: 4,
            k_final: 5,
        }
    }
}

/// Queries both indexes and merges their rankings.
///
/// The two ranking systems produce incomparable score scales, so no
/// score-based interleaving is attempted: lexical results come first as a
/// deliberate tie-break favoring exact keyword matches, then semantic
/// results, deduplicated by exact text and truncated to the final budget.
pub struct HybridRetriever<V>
where
    V: VectorIndex,
{
    vector: Arc<V>,
    lexical: Arc<LexicalIndex>,
    config: RetrieverConfig,
}

impl<V> HybridRetriever<V>
where
    V: VectorIndex,
{
    pub fn new(vector: Arc<V>, lexical: Arc<LexicalIndex>, config: RetrieverConfig) -> Self {
        Self {
            vector,
            lexical,
            config,
        }
    }

    /// Returns up to `k_final` deduplicated evidence chunks for `query`.
    ///
    /// A never-built lexical index degrades silently to semantic-only
    /// search. Both indexes returning nothing yields an empty list, which
    /// the synthesizer treats as the no-evidence condition.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Chunk>, RagError> {
        if self.lexical.is_empty() {
            debug!("lexical index empty, falling back to semantic-only retrieval");
            return self.vector.query(query, self.config.k_final).await;
        }

        let lexical_hits = self.lexical.query(query, self.config.k_lexical);
        let semantic_hits = self.vector.query(query, self.config.k_semantic).await?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut merged = Vec::new();
        for chunk in lexical_hits.into_iter().chain(semantic_hits) {
            if merged.len() == self.config.k_final {
                break;
            }
            if seen.insert(chunk.text.clone()) {
                merged.push(chunk);
            }
        }
        Ok(merged)
    }
}
