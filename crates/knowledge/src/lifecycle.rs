//! Index lifecycle: load the persisted index or rebuild it from the store.
//!
//! Startup runs `ensure_index_ready` once. A persisted index is reused
//! unless its embedding signature differs from the configured embedder or,
//! with staleness checking on, the store reports a revision other than the
//! one recorded at build time. Records changed while the process runs are
//! only picked up by an explicit `rebuild`.

use crate::config;
use crate::embeddings::{EmbeddingProvider, EmbeddingSignature};
use crate::normalizer::normalize_all;
use crate::store::{list_every_kind, RecordStore};
use crate::types::KnowledgeConfig;
use crate::vector_index::VectorIndex;
use assistant_core::AppResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_BATCH_SIZE: usize = 100;

/// Where the manager stands.
#[derive(Debug, Clone)]
pub enum IndexState {
    NotReady,
    Loaded(Arc<VectorIndex>),
}

/// Owns the build/load/persist protocol for one index location.
pub struct IndexLifecycle {
    store: Arc<dyn RecordStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    location: PathBuf,
    batch_size: usize,
    check_staleness: bool,
    state: IndexState,
}

impl IndexLifecycle {
    pub fn new(
        store: Arc<dyn RecordStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        location: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            embedder,
            location: location.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            check_staleness: true,
            state: IndexState::NotReady,
        }
    }

    /// Manager for the index configured in `knowledge.yaml`.
    pub fn from_config(
        store: Arc<dyn RecordStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        workspace: &Path,
        knowledge: &KnowledgeConfig,
    ) -> Self {
        Self::new(store, embedder, config::get_index_path(workspace, knowledge))
            .with_batch_size(knowledge.embedding.batch_size)
            .with_staleness_check(knowledge.check_staleness)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_staleness_check(mut self, enabled: bool) -> Self {
        self.check_staleness = enabled;
        self
    }

    pub fn state(&self) -> &IndexState {
        &self.state
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// The loaded index, if startup has completed.
    pub fn index(&self) -> Option<Arc<VectorIndex>> {
        match &self.state {
            IndexState::Loaded(index) => Some(Arc::clone(index)),
            IndexState::NotReady => None,
        }
    }

    /// Load or build the index. A no-op once `Loaded`.
    pub async fn ensure_index_ready(&mut self) -> AppResult<Arc<VectorIndex>> {
        if let IndexState::Loaded(index) = &self.state {
            return Ok(Arc::clone(index));
        }

        let index = match VectorIndex::load(&self.location)? {
            Some(existing) => match self.rebuild_reason(&existing)? {
                None => existing,
                Some(reason) => {
                    tracing::info!("Rebuilding index at {:?}: {}", self.location, reason);
                    self.build_and_persist().await?
                }
            },
            None => {
                tracing::info!("No usable index at {:?}; building from store", self.location);
                self.build_and_persist().await?
            }
        };

        Ok(self.activate(index))
    }

    /// Build from the current store contents and replace the persisted index.
    pub async fn rebuild(&mut self) -> AppResult<Arc<VectorIndex>> {
        tracing::info!("Explicit rebuild of index at {:?}", self.location);
        let index = self.build_and_persist().await?;
        Ok(self.activate(index))
    }

    fn activate(&mut self, index: VectorIndex) -> Arc<VectorIndex> {
        let index = Arc::new(index);
        self.state = IndexState::Loaded(Arc::clone(&index));
        tracing::info!("Index ready with {} documents", index.len());
        index
    }

    fn rebuild_reason(&self, index: &VectorIndex) -> AppResult<Option<String>> {
        let configured = EmbeddingSignature::of(self.embedder.as_ref());
        if let Some(mismatch) = configured.mismatch(&index.manifest().embedding) {
            return Ok(Some(format!("embedding configuration changed ({})", mismatch)));
        }

        if self.check_staleness {
            if let Some(current) = self.store.revision()? {
                if index.manifest().store_revision.as_deref() != Some(current.as_str()) {
                    return Ok(Some("record store revision changed".to_string()));
                }
            }
        }

        Ok(None)
    }

    async fn build_and_persist(&self) -> AppResult<VectorIndex> {
        // Read before listing: a write racing the build shows up as stale next start.
        let revision = self.store.revision()?;
        let records = list_every_kind(self.store.as_ref())?;
        let documents = normalize_all(&records);

        tracing::info!(
            "Normalized {} records into documents",
            documents.len()
        );

        let index = VectorIndex::build(documents, self.embedder.as_ref(), self.batch_size)
            .await?
            .with_store_revision(revision);
        index.persist(&self.location)?;
        Ok(index)
    }
}
