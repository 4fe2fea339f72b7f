//! Ask command handler.
//!
//! Loads (or builds) the index, then answers one question from it.

use super::pipeline;
use assistant_core::{config::AppConfig, AppError, AppResult};
use assistant_knowledge::{AnswerOptions, AnsweringEngine};
use assistant_llm::create_client;
use clap::Args;

/// Ask a question about student life in Würzburg
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of documents to retrieve (overrides knowledge.yaml)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        config.validate()?;

        let mut pipeline = pipeline::open(config)?;
        let index = pipeline.lifecycle.ensure_index_ready().await?;

        let api_key = config.resolve_api_key(&config.provider);
        let endpoint = config.provider_endpoint(&config.provider);
        let llm = create_client(&config.provider, endpoint.as_deref(), api_key.as_deref())?;

        let mut options = AnswerOptions::from_config(&config.model, &pipeline.knowledge);
        if let Some(top_k) = self.top_k {
            options.top_k = top_k;
        }

        let engine = AnsweringEngine::new(index, pipeline.embedder, llm, options)?
            .load_prompt(&config.workspace)?;
        let answer = engine.answer(&self.question).await?;

        if self.json {
            let output = serde_json::to_string_pretty(&answer)
                .map_err(|e| AppError::Serialization(format!("JSON serialization failed: {}", e)))?;
            println!("{}", output);
        } else {
            println!("{}", answer.answer_text);
            println!();
            println!("Sources:");
            for (i, source) in answer.sources.iter().enumerate() {
                println!("[{}] {}", i + 1, source.replace('\n', "\n    "));
            }
        }

        Ok(())
    }
}
