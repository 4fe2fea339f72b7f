//! LLM integration crate for the campus assistant.
//!
//! Provider-agnostic abstraction over text-completion services, with one
//! trait-based interface for every backend.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI**: Any OpenAI-compatible chat-completions endpoint
//!
//! # Example
//! ```no_run
//! use assistant_llm::{LlmClient, LlmRequest, providers::{ollama, OllamaClient}};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new(ollama::DEFAULT_OLLAMA_URL)?;
//! let request = LlmRequest::new("Where is the Mensa?", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
