//! LLM provider factory.
//!
//! Creates completion clients from a provider name, handling endpoint
//! defaults and API-key requirements.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use assistant_core::{AppError, AppResult};
use std::sync::Arc;

/// Create a completion client for `provider`.
///
/// `endpoint` overrides the provider's default base URL. OpenAI needs an
/// `api_key`; Ollama ignores it.
///
/// # Errors
/// `AppError::Config` for an unknown provider or a missing key.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;
    let base_url = endpoint.unwrap_or(provider_type.default_endpoint());
    tracing::debug!("Creating {} client for {}", provider_type.as_str(), base_url);

    let client: Arc<dyn LlmClient> = match provider_type {
        ProviderType::Ollama => Arc::new(OllamaClient::new(base_url)?),
        ProviderType::OpenAI => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI provider requires API key".to_string())
            })?;
            Arc::new(OpenAiClient::new(api_key, base_url)?)
        }
    };
    Ok(client)
}
