//! Error types for the campus assistant.
//!
//! This module defines a unified error enum that covers every error category
//! in the workspace: configuration, I/O, LLM, knowledge, record schema,
//! embedding, query validation, answering, prompt, and serialization errors.

use thiserror::Error;

/// Unified error type for the campus assistant.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Text-completion provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Record store and vector index errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// A record of an unknown kind, or one that violates its kind's schema.
    /// Fatal: indicates a programming or data error.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Embedding service failure (network, quota, auth, malformed response)
    #[error("Embedding service error: {0}")]
    Embedding(String),

    /// Rejected caller input (empty question, non-positive k)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Any downstream failure while answering a question.
    /// The message is deliberately opaque; the cause is logged.
    #[error("Answering error: {0}")]
    Answering(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
