//! Narrow seam over the generative-model collaborator.
//!
//! The rewriter and synthesizer depend on [`ChatModel`] rather than on a
//! concrete provider so they stay testable with scripted fakes. Any
//! `rig::completion::CompletionModel` plugs in through [`RigChatModel`].

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionModel, Message};

use crate::types::RagError;

/// Minimal completion interface: system preamble plus one user prompt in,
/// assistant text out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, preamble: &str, prompt: &str) -> Result<String, RagError>;
}

/// Adapter from any rig completion model to [`ChatModel`].
#[derive(Clone)]
pub struct RigChatModel<M>
where
    M: CompletionModel,
{
    model: M,
    temperature: f64,
}

impl<M> RigChatModel<M>
where
    M: CompletionModel,
{
    pub fn new(model: M) -> Self {
        Self {
            model,
            temperature: 0.3,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl<M> ChatModel for RigChatModel<M>
where
    M: CompletionModel,
{
    async fn complete(&self, preamble: &str, prompt: &str) -> Result<String, RagError> {
        let request = self
            .model
            .completion_request(Message::user(prompt))
            .preamble(preamble.to_owned())
            .temperature(self.temperature)
            .build();

        let response = self
            .model
            .completion(request)
            .await
            .map_err(|err| RagError::Completion(err.to_string()))?;

        let text = response
            .choice
            .into_iter()
            .filter_map(|content| match content {
                AssistantContent::Text(text) => Some(text.text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(text)
    }
}
