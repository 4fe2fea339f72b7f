//! Offline embedding provider built from hashed character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use assistant_core::{AppError, AppResult};
use std::collections::{HashMap, HashSet};

const MODEL_NAME: &str = "trigram-v1";

/// English and German function words that carry no retrieval signal.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "this", "that", "are", "was", "were", "have", "has",
    "had", "its", "their", "they", "them", "near", "der", "die", "das", "und", "mit", "von",
    "für", "ist", "ein", "eine", "den", "dem", "des", "auf", "bei", "zum", "zur",
];

/// Trigram-based embedding provider for local, offline operation.
///
/// Deterministic and content-dependent, without real semantics: words are
/// split on any non-alphanumeric character, each word and each of its
/// character trigrams is hashed into a bucket, and the result is scaled to
/// unit length.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
    stop_words: HashSet<&'static str>,
}

impl TrigramProvider {
    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    fn bucket(&self, token: &str, seed: u64) -> usize {
        let hash = token
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(seed).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }

    fn generate_embedding(&self, text: &str) -> AppResult<Vec<f32>> {
        if self.dimensions == 0 {
            return Err(AppError::Embedding(
                "Trigram provider configured with zero dimensions".to_string(),
            ));
        }

        let lower = text.to_lowercase();
        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !self.stop_words.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        let mut embedding = vec![0.0f32; self.dimensions];
        for (word, freq) in &word_freq {
            let weight = *freq as f32;

            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                embedding[self.bucket(&trigram, 37)] += weight.sqrt();
            }

            embedding[self.bucket(word, 31)] += weight;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        Ok(embedding)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|text| self.generate_embedding(text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_embed_is_unit_length() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("Apartment: Altstadt Studio").await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_order() {
        let provider = TrigramProvider::new(128);
        let texts = vec!["Mensa Hubland".to_string(), "Sparkasse Mainfranken".to_string()];

        let batch = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], provider.embed("Sparkasse Mainfranken").await.unwrap());
    }

    #[tokio::test]
    async fn test_deterministic() {
        let provider = TrigramProvider::new(384);
        let first = provider.embed("Bürgerbüro Anmeldung").await.unwrap();
        let second = provider.embed("Bürgerbüro Anmeldung").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_punctuation_does_not_split_meaning() {
        let provider = TrigramProvider::new(384);
        let labelled = provider.embed("Apartment: Studio,").await.unwrap();
        let plain = provider.embed("apartment studio").await.unwrap();
        assert!((dot(&labelled, &plain) - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let provider = TrigramProvider::new(384);
        let query = provider.embed("cheap studio apartment").await.unwrap();
        let studio = provider.embed("Apartment: Altstadt Studio").await.unwrap();
        let bank = provider.embed("Bank: Sparkasse Mainfranken").await.unwrap();

        assert!(dot(&query, &studio) > dot(&query, &bank));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("").await.unwrap();
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_zero_dimensions_rejected() {
        let provider = TrigramProvider::new(0);
        assert!(matches!(
            provider.embed("x").await,
            Err(AppError::Embedding(_))
        ));
    }
}
