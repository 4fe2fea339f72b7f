//! Embedding configuration types.

use crate::embeddings::EmbeddingProvider;
use serde::{Deserialize, Serialize};

/// Embedding settings, the `embedding` section of `knowledge.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama", "openai"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding vector dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Override for the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_provider() -> String {
    "trigram".to_string()
}

fn default_model() -> String {
    "trigram-v1".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_batch_size() -> usize {
    100
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            endpoint: None,
        }
    }
}

/// Identity of the embedding space an index was built in.
///
/// Vectors from different signatures are not comparable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddingSignature {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl EmbeddingSignature {
    pub fn of(provider: &dyn EmbeddingProvider) -> Self {
        Self {
            provider: provider.provider_name().to_string(),
            model: provider.model_name().to_string(),
            dimensions: provider.dimensions(),
        }
    }

    /// Describe how `other` differs from this signature, if at all.
    pub fn mismatch(&self, other: &Self) -> Option<String> {
        if self.provider != other.provider {
            return Some(format!(
                "Provider mismatch: expected '{}', got '{}'",
                self.provider, other.provider
            ));
        }

        if self.model != other.model {
            return Some(format!(
                "Model mismatch: expected '{}', got '{}'",
                self.model, other.model
            ));
        }

        if self.dimensions != other.dimensions {
            return Some(format!(
                "Dimension mismatch: expected {}, got {}",
                self.dimensions, other.dimensions
            ));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature() -> EmbeddingSignature {
        EmbeddingSignature {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
        }
    }

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 100);
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: EmbeddingConfig =
            serde_yaml::from_str("provider: openai\nmodel: text-embedding-ada-002\ndimensions: 1536\n")
                .unwrap();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.dimensions, 1536);
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_signature_matches_itself() {
        assert!(signature().mismatch(&signature()).is_none());
    }

    #[test]
    fn test_signature_provider_mismatch() {
        let other = EmbeddingSignature {
            provider: "openai".to_string(),
            ..signature()
        };
        let reason = signature().mismatch(&other).unwrap();
        assert!(reason.contains("Provider mismatch"));
    }

    #[test]
    fn test_signature_dimension_mismatch() {
        let other = EmbeddingSignature {
            dimensions: 1536,
            ..signature()
        };
        let reason = signature().mismatch(&other).unwrap();
        assert!(reason.contains("Dimension mismatch"));
    }
}
