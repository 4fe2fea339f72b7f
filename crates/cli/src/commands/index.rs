//! Index command handler.
//!
//! Inspects or rebuilds the persisted vector index.

use super::pipeline;
use assistant_core::{config::AppConfig, AppError, AppResult};
use assistant_knowledge::{config as knowledge_config, RecordStore, VectorIndex};
use clap::{Args, Subcommand};

/// Vector index management
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Show the persisted index and whether it is current
    Status(IndexStatusCommand),
    /// Rebuild the index from the record store
    Rebuild(IndexRebuildCommand),
}

#[derive(Args, Debug)]
pub struct IndexStatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexStatusCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index status command");

        let pipeline = pipeline::open(config)?;
        let location = knowledge_config::get_index_path(&config.workspace, &pipeline.knowledge);

        let Some(index) = VectorIndex::load(&location)? else {
            if self.json {
                println!("{}", serde_json::json!({ "location": location, "present": false }));
            } else {
                println!("No index at {}", location.display());
                println!("Run 'assistant index rebuild' or ask a question to build it.");
            }
            return Ok(());
        };

        let stats = index.stats(&location)?;
        let current_revision = pipeline.store.revision()?;
        let stale = current_revision.is_some() && current_revision != stats.store_revision;

        if self.json {
            let output = serde_json::json!({
                "location": location,
                "present": true,
                "documentCount": stats.document_count,
                "dimensions": stats.dimensions,
                "provider": stats.provider,
                "model": stats.model,
                "builtAt": stats.built_at,
                "placeholder": stats.placeholder,
                "sizeBytes": stats.size_bytes,
                "stale": stale,
            });
            let output = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(format!("JSON serialization failed: {}", e)))?;
            println!("{}", output);
        } else {
            println!("Index: {}", location.display());
            println!("  Documents: {}", stats.document_count);
            if stats.placeholder {
                println!("  (placeholder only: the record store was empty)");
            }
            println!("  Embedding: {} / {} ({} dims)", stats.provider, stats.model, stats.dimensions);
            println!("  Built at: {}", stats.built_at);
            println!("  Size: {} bytes", stats.size_bytes);
            println!("  Stale: {}", if stale { "yes" } else { "no" });
        }

        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct IndexRebuildCommand {}

impl IndexRebuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index rebuild command");

        let mut pipeline = pipeline::open(config)?;
        let index = pipeline.lifecycle.rebuild().await?;

        println!(
            "Rebuilt index with {} documents at {}",
            index.len(),
            pipeline.lifecycle.location().display()
        );
        Ok(())
    }
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IndexAction::Status(cmd) => cmd.execute(config).await,
            IndexAction::Rebuild(cmd) => cmd.execute(config).await,
        }
    }
}
