//! Command handlers for the assistant CLI.

pub mod ask;
pub mod index;
mod pipeline;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use index::IndexCommand;
