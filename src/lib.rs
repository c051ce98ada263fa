//! Hybrid lexical + semantic retrieval engine with grounded answer
//! generation.
//!
//! ```text
//! Documents ──► normalize ──► chunker ──┬─► lexical::LexicalIndex (BM25, memory)
//!                                       └─► stores::VectorIndex   (embeddings, disk)
//!
//! Question ──► rewrite::QueryRewriter ──► retriever::HybridRetriever
//!                                                   │
//!                          lexical hits ◄───────────┼──────────► semantic hits
//!                                                   ▼
//!                               merge · dedup · truncate (evidence)
//!                                                   │
//!                                                   ▼
//!                               synthesis::AnswerSynthesizer ──► Answer
//! ```
//!
//! [`engine::KnowledgeEngine`] is the facade over the whole pipeline; the
//! embedding model, completion model, and vector store are pluggable at
//! trait seams ([`stores::VectorIndex`], [`llm::ChatModel`]).

pub mod chunker;
pub mod engine;
pub mod ingestion;
pub mod lexical;
pub mod llm;
pub mod normalize;
pub mod retriever;
pub mod rewrite;
pub mod stores;
pub mod synthesis;
pub mod testing;
pub mod types;

pub use chunker::{ChunkerConfig, split_documents};
pub use engine::{AskOutcome, KnowledgeEngine};
pub use lexical::LexicalIndex;
pub use llm::{ChatModel, RigChatModel};
pub use normalize::normalize;
pub use retriever::{HybridRetriever, RetrieverConfig};
pub use rewrite::QueryRewriter;
pub use stores::{MemoryChunkStore, SqliteChunkStore, VectorIndex};
pub use synthesis::{Answer, AnswerSynthesizer, NO_EVIDENCE_ANSWER};
pub use types::{Chunk, ConversationTurn, Document, RagError};
