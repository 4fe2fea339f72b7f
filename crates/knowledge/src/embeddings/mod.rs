//! Embedding generation.
//!
//! Provider-agnostic embedding behind the `EmbeddingProvider` trait, plus
//! the batching used when building an index.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::{EmbeddingConfig, EmbeddingSignature};
pub use provider::{create_provider, EmbeddingProvider};

use assistant_core::{AppError, AppResult};

/// Embed `texts` in batches of at most `batch_size`, preserving order.
///
/// Fails on the first provider error. Every returned vector has the
/// provider's declared dimension.
pub async fn embed_texts(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> AppResult<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let batch_size = batch_size.max(1);
    tracing::info!(
        "Embedding {} texts using provider '{}' (model: {}, batch size: {})",
        texts.len(),
        provider.provider_name(),
        provider.model_name(),
        batch_size
    );

    let mut embeddings = Vec::with_capacity(texts.len());
    for (i, batch) in texts.chunks(batch_size).enumerate() {
        let vectors = provider.embed_batch(batch).await?;

        if vectors.len() != batch.len() {
            return Err(AppError::Embedding(format!(
                "Provider returned {} embeddings for {} texts",
                vectors.len(),
                batch.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != provider.dimensions()) {
            return Err(AppError::Embedding(format!(
                "Embedding dimension {} does not match provider dimension {}",
                bad.len(),
                provider.dimensions()
            )));
        }

        tracing::debug!("Embedded batch {} ({} texts)", i + 1, batch.len());
        embeddings.extend(vectors);
    }

    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct CountingProvider {
        calls: AtomicUsize,
        short_by: usize,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn provider_name(&self) -> &str {
            "counting"
        }

        fn model_name(&self) -> &str {
            "counting-v1"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .skip(self.short_by)
                .map(|t| vec![t.len() as f32, 1.0])
                .collect())
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| "x".repeat(i + 1)).collect()
    }

    #[tokio::test]
    async fn test_batches_and_order() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
            short_by: 0,
        };

        let vectors = embed_texts(&provider, &texts(5), 2).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        let lengths: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(lengths, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
            short_by: 0,
        };
        assert!(embed_texts(&provider, &[], 10).await.unwrap().is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_batch_is_error() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
            short_by: 1,
        };
        let result = embed_texts(&provider, &texts(3), 10).await;
        assert!(matches!(result, Err(AppError::Embedding(_))));
    }

    #[tokio::test]
    async fn test_trigram_batches_match_single_calls() {
        let provider = TrigramProvider::new(64);
        let input = vec!["Mensa".to_string(), "Bibliothek".to_string(), "Hubland".to_string()];

        let batched = embed_texts(&provider, &input, 1).await.unwrap();
        assert_eq!(batched[2], provider.embed("Hubland").await.unwrap());
    }
}
