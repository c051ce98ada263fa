//! Rewrites follow-up questions into standalone questions before retrieval.

use std::sync::Arc;

use tracing::warn;

use crate::llm::ChatModel;
use crate::types::ConversationTurn;

const REWRITE_PREAMBLE: &str = "Given the conversation history, rewrite the \
follow-up question to be a standalone question. Respond with the standalone \
question only.";

/// Turns a follow-up question into a self-contained one using prior turns.
///
/// Rewriting is an optimization, not a correctness requirement: any model
/// failure falls back to the original query instead of propagating.
pub struct QueryRewriter<C>
where
    C: ChatModel,
{
    chat: Arc<C>,
}

impl<C> QueryRewriter<C>
where
    C: ChatModel,
{
    pub fn new(chat: Arc<C>) -> Self {
        Self { chat }
    }

    /// Returns the standalone form of `query`.
    ///
    /// An empty history is a pure passthrough: the query comes back unchanged
    /// with zero model calls.
    pub async fn rewrite(&self, query: &str, history: &[ConversationTurn]) -> String {
        if history.is_empty() {
            return query.to_string();
        }

        let prompt = rewrite_prompt(query, history);
        match self.chat.complete(REWRITE_PREAMBLE, &prompt).await {
            Ok(rewritten) => {
                let rewritten = rewritten.trim();
                if rewritten.is_empty() {
                    warn!("query rewrite returned empty output, keeping original query");
                    query.to_string()
                } else {
                    rewritten.to_string()
                }
            }
            Err(err) => {
                warn!(error = %err, "query rewrite failed, keeping original query");
                query.to_string()
            }
        }
    }
}

fn rewrite_prompt(query: &str, history: &[ConversationTurn]) -> String {
    let transcript = history
        .iter()
        .map(|turn| format!("User: {}\nAI: {}", turn.user, turn.assistant))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Chat History:\n{transcript}\nFollow Up Input: {query}\nStandalone Question:"
    )
}
