//! Prompt system for the campus assistant.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions with workspace overrides
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{load_prompt, load_prompt_or_default, parse_prompt, prompt_path};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
