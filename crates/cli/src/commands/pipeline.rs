//! Wiring shared by the CLI commands.

use assistant_core::{config::AppConfig, AppResult};
use assistant_knowledge::{
    config as knowledge_config, create_provider, EmbeddingProvider, IndexLifecycle,
    KnowledgeConfig, SqliteRecordStore,
};
use std::sync::Arc;

pub struct Pipeline {
    pub knowledge: KnowledgeConfig,
    pub store: Arc<SqliteRecordStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub lifecycle: IndexLifecycle,
}

/// Open the record store and embedder configured for the workspace.
pub fn open(config: &AppConfig) -> AppResult<Pipeline> {
    let knowledge = knowledge_config::load_config(&config.workspace)?;

    let db_path = knowledge_config::get_database_path(&config.workspace, &knowledge);
    tracing::debug!("Record store: {:?}", db_path);
    let store = Arc::new(SqliteRecordStore::open(&db_path)?);

    let api_key = config.resolve_api_key(&knowledge.embedding.provider);
    let embedder = create_provider(&knowledge.embedding, api_key.as_deref())?;

    let lifecycle = IndexLifecycle::from_config(
        store.clone(),
        Arc::clone(&embedder),
        &config.workspace,
        &knowledge,
    );

    Ok(Pipeline {
        knowledge,
        store,
        embedder,
        lifecycle,
    })
}
