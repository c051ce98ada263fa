//! Grounded answer generation from retrieved evidence.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::llm::ChatModel;
use crate::types::{Chunk, RagError};

/// Fixed response used whenever retrieval produced no evidence.
pub const NO_EVIDENCE_ANSWER: &str =
    "I could not find any relevant information in the uploaded documents.";

const SYNTHESIS_PREAMBLE: &str = "You are a research assistant. Answer the \
question based ONLY on the provided context. If the answer is not in the \
context, say you don't know.";

/// A generated answer plus the evidence texts it was grounded on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    /// Chunk texts in retrieval order, for provenance display.
    pub evidence: Vec<String>,
}

/// Produces an answer treating retrieved evidence as the only admissible
/// knowledge.
pub struct AnswerSynthesizer<C>
where
    C: ChatModel,
{
    chat: Arc<C>,
}

impl<C> AnswerSynthesizer<C>
where
    C: ChatModel,
{
    pub fn new(chat: Arc<C>) -> Self {
        Self { chat }
    }

    /// Answers `query` strictly from `evidence`.
    ///
    /// Empty evidence short-circuits to the fixed "not found" answer without
    /// calling the model. Unlike query rewriting, a model failure here is the
    /// primary deliverable failing and propagates to the caller.
    pub async fn answer(&self, query: &str, evidence: &[Chunk]) -> Result<Answer, RagError> {
        if evidence.is_empty() {
            return Ok(Answer {
                text: NO_EVIDENCE_ANSWER.to_string(),
                evidence: Vec::new(),
            });
        }

        let evidence_texts: Vec<String> =
            evidence.iter().map(|chunk| chunk.text.clone()).collect();
        let context = evidence_texts.join("\n\n");
        let prompt = format!("Context:\n{context}\n\nQuestion:\n{query}\n\nAnswer:");

        let text = self.chat.complete(SYNTHESIS_PREAMBLE, &prompt).await?;

        Ok(Answer {
            text,
            evidence: evidence_texts,
        })
    }
}
