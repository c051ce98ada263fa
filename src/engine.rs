//! Orchestration facade tying ingestion, retrieval, and answering together.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::chunker::{ChunkerConfig, split_documents};
use crate::lexical::LexicalIndex;
use crate::llm::ChatModel;
use crate::retriever::{HybridRetriever, RetrieverConfig};
use crate::rewrite::QueryRewriter;
use crate::stores::VectorIndex;
use crate::synthesis::AnswerSynthesizer;
use crate::types::{ConversationTurn, Document, RagError};

/// Response shape for a question, mirroring the external ask contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AskOutcome {
    pub query: String,
    pub rewritten_query: String,
    pub answer: String,
    pub evidence: Vec<String>,
}

/// The knowledge base: both indexes, the model seam, and the pipeline
/// configuration.
///
/// Ingestion and reset serialize on an internal write guard so a reset can
/// never interleave with an in-flight ingestion and leave one index holding
/// chunks the other has dropped. Queries take no guard; the only coherence
/// requirement is within a single ingestion.
pub struct KnowledgeEngine<V, C>
where
    V: VectorIndex,
    C: ChatModel,
{
    vector: Arc<V>,
    lexical: Arc<LexicalIndex>,
    rewriter: QueryRewriter<C>,
    synthesizer: AnswerSynthesizer<C>,
    retriever: HybridRetriever<V>,
    chunker: ChunkerConfig,
    write_guard: Mutex<()>,
}

impl<V, C> KnowledgeEngine<V, C>
where
    V: VectorIndex,
    C: ChatModel,
{
    pub fn new(vector: Arc<V>, chat: Arc<C>) -> Self {
        Self::with_config(
            vector,
            chat,
            ChunkerConfig::default(),
            RetrieverConfig::default(),
        )
    }

    pub fn with_config(
        vector: Arc<V>,
        chat: Arc<C>,
        chunker: ChunkerConfig,
        retriever_config: RetrieverConfig,
    ) -> Self {
        let lexical = Arc::new(LexicalIndex::new());
        Self {
            retriever: HybridRetriever::new(vector.clone(), lexical.clone(), retriever_config),
            rewriter: QueryRewriter::new(chat.clone()),
            synthesizer: AnswerSynthesizer::new(chat),
            vector,
            lexical,
            chunker,
            write_guard: Mutex::new(()),
        }
    }

    /// Normalizes, chunks, and indexes `documents` in both indexes.
    ///
    /// Returns the number of chunks stored. The semantic add happens first
    /// and is durable before the lexical rebuild; if it fails nothing is
    /// indexed anywhere, so no partial chunks survive a failed ingestion.
    pub async fn ingest_documents(&self, documents: Vec<Document>) -> Result<usize, RagError> {
        let _guard = self.write_guard.lock().await;

        let chunks = split_documents(&documents, &self.chunker);
        if chunks.is_empty() {
            info!(documents = documents.len(), "ingestion produced no chunks");
            return Ok(0);
        }
        let stored = chunks.len();

        self.vector.add_chunks(chunks.clone()).await?;
        self.lexical.extend(chunks);

        info!(
            chunks = stored,
            total = self.lexical.len(),
            "ingestion complete, lexical index rebuilt"
        );
        Ok(stored)
    }

    /// Wipes the knowledge base.
    ///
    /// Best effort: a semantic-store deletion failure is logged and
    /// swallowed, and the in-memory lexical state is cleared regardless, so
    /// the system never ends up worse off than before the reset attempt.
    /// The accepted inconsistency is a semantic index retaining stale data
    /// after a failed reset.
    pub async fn reset(&self) -> Result<(), RagError> {
        let _guard = self.write_guard.lock().await;

        match self.vector.delete_all().await {
            Ok(deleted) => info!(deleted, "semantic index cleared"),
            Err(err) => warn!(error = %err, "semantic index reset failed, clearing memory state anyway"),
        }
        self.lexical.clear();
        Ok(())
    }

    /// Answers `query` against the knowledge base.
    ///
    /// Pipeline: rewrite the follow-up into a standalone question, retrieve
    /// hybrid evidence for it, synthesize a grounded answer. Evidence is
    /// returned alongside the answer for provenance display.
    pub async fn ask(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<AskOutcome, RagError> {
        let rewritten = self.rewriter.rewrite(query, history).await;
        let evidence = self.retriever.retrieve(&rewritten).await?;
        let answer = self.synthesizer.answer(&rewritten, &evidence).await?;

        Ok(AskOutcome {
            query: query.to_string(),
            rewritten_query: rewritten,
            answer: answer.text,
            evidence: answer.evidence,
        })
    }

    /// Number of chunks in the lexical corpus since the last reset.
    pub fn lexical_len(&self) -> usize {
        self.lexical.len()
    }

    /// Number of chunks in the semantic store.
    pub async fn semantic_count(&self) -> Result<usize, RagError> {
        self.vector.count().await
    }
}
