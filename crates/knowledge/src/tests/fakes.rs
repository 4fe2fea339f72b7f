//! Hand-written fakes for the external services.

use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::record::{Record, RecordKind};
use crate::store::{MemoryRecordStore, RecordStore};
use assistant_core::{AppError, AppResult};
use assistant_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Store wrapper counting `list_all` calls.
pub struct CountingStore {
    pub inner: MemoryRecordStore,
    pub list_calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            inner: MemoryRecordStore::new(records),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

impl RecordStore for CountingStore {
    fn list_all(&self, kind: RecordKind) -> AppResult<Vec<Record>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_all(kind)
    }

    fn revision(&self) -> AppResult<Option<String>> {
        self.inner.revision()
    }
}

/// Trigram embedder that fails on the `fail_at`-th text (1-based) and counts calls.
#[derive(Debug)]
pub struct FlakyEmbedder {
    inner: TrigramProvider,
    fail_at: Option<usize>,
    embedded: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn new(dimensions: usize, fail_at: Option<usize>) -> Self {
        Self {
            inner: TrigramProvider::new(dimensions),
            fail_at,
            embedded: AtomicUsize::new(0),
        }
    }

    pub fn embedded(&self) -> usize {
        self.embedded.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    fn provider_name(&self) -> &str {
        // Same signature as the plain trigram provider so persisted indexes stay compatible.
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            let n = self.embedded.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(n) == self.fail_at {
                return Err(AppError::Embedding("embedding service unavailable".to_string()));
            }
            vectors.extend(self.inner.embed_batch(std::slice::from_ref(text)).await?);
        }
        Ok(vectors)
    }
}

/// Completion client that echoes a fixed reply and records requests.
#[derive(Default)]
pub struct ScriptedLlm {
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(LlmResponse {
            content: "🏠 The Altstadt Studio costs €450 per month.".to_string(),
            model: request.model.clone(),
            usage: LlmUsage::new(42, 12),
        })
    }
}
