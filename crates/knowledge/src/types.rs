//! Knowledge system type definitions.

use crate::embeddings::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for the answering pipeline, loaded from `.assistant/knowledge.yaml`.
///
/// Relative paths are resolved against the workspace root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeConfig {
    /// SQLite record store
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Directory holding the persisted vector index
    #[serde(default = "default_index_location")]
    pub index_location: PathBuf,

    /// Embedding provider settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Documents retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Sampling temperature for answer generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated answer tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Rebuild at startup when the store revision differs from the index
    #[serde(default = "default_check_staleness")]
    pub check_staleness: bool,
}

fn default_database() -> PathBuf {
    PathBuf::from(".assistant/assistant.sqlite")
}

fn default_index_location() -> PathBuf {
    PathBuf::from(".assistant/vector_store")
}

fn default_top_k() -> usize {
    3
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_check_staleness() -> bool {
    true
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            index_location: default_index_location(),
            embedding: EmbeddingConfig::default(),
            top_k: default_top_k(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            check_staleness: default_check_staleness(),
        }
    }
}
