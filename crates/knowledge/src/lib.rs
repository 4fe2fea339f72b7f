//! Knowledge pipeline for the student assistant.
//!
//! Structured records are normalized into documents, embedded into a
//! persisted vector index and retrieved to ground generated answers.

pub mod answer;
pub mod config;
pub mod embeddings;
pub mod lifecycle;
pub mod normalizer;
pub mod record;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use answer::{Answer, AnswerOptions, AnsweringEngine, FORMATTING_DIRECTIVE};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider, EmbeddingSignature};
pub use lifecycle::{IndexLifecycle, IndexState};
pub use normalizer::{normalize, normalize_all};
pub use record::{Document, Record, RecordKind, RecordMeta, SourceKind, PLACEHOLDER_TEXT};
pub use store::{MemoryRecordStore, RecordStore, SqliteRecordStore};
pub use types::KnowledgeConfig;
pub use vector_index::{IndexManifest, IndexStats, VectorIndex};
