//! Deterministic collaborator fakes for tests and demos.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rig::embeddings::{Embedding, EmbeddingError, EmbeddingModel};

use crate::llm::ChatModel;
use crate::stores::{MemoryChunkStore, VectorIndex};
use crate::types::{Chunk, RagError};

/// Hash-seeded embedding model.
///
/// Identical text always embeds identically, so exact-match similarity is
/// reliable in tests without any external model. The vectors carry no real
/// semantics beyond that.
#[derive(Clone, Default)]
pub struct DeterministicEmbedding;

impl EmbeddingModel for DeterministicEmbedding {
    const MAX_DOCUMENTS: usize = 64;

    type Client = ();

    fn make(_client: &Self::Client, _model: impl Into<String>, _dims: Option<usize>) -> Self {
        Self
    }

    fn ndims(&self) -> usize {
        8
    }

    fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> impl std::future::Future<Output = Result<Vec<Embedding>, EmbeddingError>> + Send {
        let docs: Vec<String> = texts.into_iter().collect();
        async move {
            Ok(docs
                .into_iter()
                .map(|document| Embedding {
                    vec: hash_to_vec(&document),
                    document,
                })
                .collect())
        }
    }
}

fn hash_to_vec(text: &str) -> Vec<f64> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..8)
        .map(|i| {
            let bits = seed.rotate_left((i * 8) as u32) ^ ((i as u64) << 24);
            (bits as f64) / u32::MAX as f64
        })
        .collect()
}

/// Chat model that replies from a script and records every call.
///
/// Use [`ScriptedChatModel::replying`] for a fixed reply,
/// [`ScriptedChatModel::failing`] for a model that always errors, and the
/// call counter to assert that a branch made zero model calls.
pub struct ScriptedChatModel {
    reply: Result<String, String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedChatModel {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent prompt, if any call was made.
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

/// Vector index with switchable failure injection.
///
/// Delegates to a [`MemoryChunkStore`] until a failure mode is armed, so a
/// test can ingest real data first and then make a specific write path
/// fail.
pub struct FlakyChunkStore {
    inner: MemoryChunkStore<DeterministicEmbedding>,
    add_failure: AtomicBool,
    delete_failure: AtomicBool,
}

impl FlakyChunkStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryChunkStore::new(DeterministicEmbedding),
            add_failure: AtomicBool::new(false),
            delete_failure: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent `add_chunks` call fail (or succeed again).
    pub fn fail_adds(&self, fail: bool) {
        self.add_failure.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `delete_all` call fail (or succeed again).
    pub fn fail_deletes(&self, fail: bool) {
        self.delete_failure.store(fail, Ordering::SeqCst);
    }
}

impl Default for FlakyChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for FlakyChunkStore {
    async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<(), RagError> {
        if self.add_failure.load(Ordering::SeqCst) {
            return Err(RagError::Storage("injected add failure".to_string()));
        }
        self.inner.add_chunks(chunks).await
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<Chunk>, RagError> {
        self.inner.query(text, top_k).await
    }

    async fn delete_all(&self) -> Result<usize, RagError> {
        if self.delete_failure.load(Ordering::SeqCst) {
            return Err(RagError::Storage("injected delete failure".to_string()));
        }
        self.inner.delete_all().await
    }

    async fn count(&self) -> Result<usize, RagError> {
        self.inner.count().await
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, _preamble: &str, prompt: &str) -> Result<String, RagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(message) => Err(RagError::Completion(message.clone())),
        }
    }
}
