//! Question answering over the vector index.
//!
//! Retrieves the nearest documents for a question, renders them into the
//! answer prompt and asks the completion service for a reply. The retrieved
//! texts come back as sources, nearest first.

use crate::embeddings::EmbeddingProvider;
use crate::types::KnowledgeConfig;
use crate::vector_index::VectorIndex;
use assistant_core::{AppError, AppResult};
use assistant_llm::{LlmClient, LlmRequest};
use assistant_prompt::{build_prompt, load_prompt_or_default, parse_prompt, PromptDefinition};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Identifier of the workspace prompt override (`.assistant/prompts/answer.yml`).
pub const ANSWER_PROMPT_ID: &str = "answer";

/// Output rules appended to every generation request.
pub const FORMATTING_DIRECTIVE: &str = "\
Please structure your response in a clear and readable way:
- Use emojis where appropriate to make the text more engaging
- Use simple bullet points (•) for lists if needed
- Keep paragraphs short and well-organized
- Put any links on their own separate lines without any special formatting
- Don't use any special Markdown formatting or styling
- Use plain text only";

/// Built-in answer prompt.
pub const DEFAULT_ANSWER_PROMPT: &str = r#"id: answer
title: Student Assistant Answer
apiVersion: "1.0"
system: |
  You are a helpful assistant for international students in Würzburg.
  Answer using only the information in the provided context. If the context
  does not contain the answer, say that you could not find this information.
  Do not mention documents, context numbers or how the information was retrieved.
template: |
  Question:
  {{question}}

  Context:
  {{context}}
"#;

/// Message returned to callers for any failure behind the answering boundary.
const OPAQUE_FAILURE: &str = "Sorry, something went wrong while answering your question";

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOptions {
    pub model: String,
    pub top_k: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl AnswerOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            top_k: 3,
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    pub fn from_config(model: impl Into<String>, config: &KnowledgeConfig) -> Self {
        Self {
            model: model.into(),
            top_k: config.top_k,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// A generated answer and the document texts it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer_text: String,
    pub sources: Vec<String>,
}

/// Answers questions against one immutable index.
///
/// Shared across concurrent callers; `answer` takes `&self`.
pub struct AnsweringEngine {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    options: AnswerOptions,
}

impl AnsweringEngine {
    /// Engine using the built-in answer prompt.
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
        options: AnswerOptions,
    ) -> AppResult<Self> {
        if options.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        Ok(Self {
            index,
            embedder,
            llm,
            prompt: parse_prompt(DEFAULT_ANSWER_PROMPT)?,
            options,
        })
    }

    pub fn with_prompt(mut self, prompt: PromptDefinition) -> Self {
        self.prompt = prompt;
        self
    }

    /// Use the workspace's `answer` prompt override when one exists.
    pub fn load_prompt(self, workspace: &Path) -> AppResult<Self> {
        let prompt = load_prompt_or_default(workspace, ANSWER_PROMPT_ID, DEFAULT_ANSWER_PROMPT)?;
        Ok(self.with_prompt(prompt))
    }

    pub fn options(&self) -> &AnswerOptions {
        &self.options
    }

    /// Answer `question` from the indexed documents.
    ///
    /// A blank question is `InvalidInput`. Every other failure is reported
    /// as an opaque `Answering` error and logged with its cause.
    pub async fn answer(&self, question: &str) -> AppResult<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput("question must not be empty".to_string()));
        }

        match self.answer_inner(question).await {
            Ok(answer) => Ok(answer),
            Err(cause) => {
                tracing::error!("Answering failed: {}", cause);
                Err(AppError::Answering(OPAQUE_FAILURE.to_string()))
            }
        }
    }

    async fn answer_inner(&self, question: &str) -> AppResult<Answer> {
        let retrieved = self
            .index
            .similarity_query(self.embedder.as_ref(), question, self.options.top_k)
            .await?;

        tracing::debug!(
            "Retrieved {} documents (best score: {:.3})",
            retrieved.len(),
            retrieved.first().map(|(_, score)| *score).unwrap_or(0.0)
        );

        let sources: Vec<String> = retrieved.into_iter().map(|(doc, _)| doc.text).collect();
        let request = self.build_request(question, &sources)?;

        let response = self.llm.complete(&request).await?;
        tracing::info!(
            "Answer generated by {} ({} tokens)",
            self.llm.provider_name(),
            response.usage.total_tokens
        );

        Ok(Answer {
            answer_text: response.content,
            sources,
        })
    }

    fn build_request(&self, question: &str, sources: &[String]) -> AppResult<LlmRequest> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        variables.insert("context".to_string(), build_context(sources));

        let built = build_prompt(&self.prompt, variables)?;
        let user = format!("{}\n\n{}", built.user.trim_end(), FORMATTING_DIRECTIVE);

        let mut request = LlmRequest::new(user, &self.options.model)
            .with_temperature(self.options.temperature)
            .with_max_tokens(self.options.max_tokens);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        Ok(request)
    }
}

fn build_context(sources: &[String]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[Document {}]\n{}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::record::{Document, SourceKind, RecordKind};
    use assistant_llm::{LlmResponse, LlmUsage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        calls: AtomicUsize,
        last: Mutex<Option<LlmRequest>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl LlmClient for RecordingClient {
        fn provider_name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request.clone());
            if self.fail {
                return Err(AppError::Llm("upstream returned 503".to_string()));
            }
            Ok(LlmResponse {
                content: "• Register at the Bürgerbüro".to_string(),
                model: request.model.clone(),
                usage: LlmUsage::new(10, 5),
            })
        }
    }

    fn doc(id: i64, text: &str) -> Document {
        Document {
            text: text.to_string(),
            source_kind: SourceKind::Record(RecordKind::GeneralInfo),
            record_id: id,
        }
    }

    async fn engine(client: Arc<RecordingClient>, top_k: usize) -> AnsweringEngine {
        let embedder = Arc::new(TrigramProvider::new(128));
        let docs = vec![
            doc(1, "Title: Anmeldung\nDescription: Register your address within two weeks"),
            doc(2, "Title: Mensa\nDescription: Lunch at the Hubland canteen"),
            doc(3, "Title: Semesterticket\nDescription: Public transport for students"),
        ];
        let index = VectorIndex::build(docs, embedder.as_ref(), 10).await.unwrap();
        let mut options = AnswerOptions::new("llama3.2");
        options.top_k = top_k;
        AnsweringEngine::new(Arc::new(index), embedder, client, options).unwrap()
    }

    #[tokio::test]
    async fn test_blank_question_is_invalid_input() {
        let client = Arc::new(RecordingClient::default());
        let engine = engine(Arc::clone(&client), 3).await;

        for question in ["", "   \n\t"] {
            let result = engine.answer(question).await;
            assert!(matches!(result, Err(AppError::InvalidInput(_))));
        }
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_request_carries_directive_and_context() {
        let client = Arc::new(RecordingClient::default());
        let engine = engine(Arc::clone(&client), 2).await;

        let answer = engine.answer("How do I register my address?").await.unwrap();
        assert_eq!(answer.answer_text, "• Register at the Bürgerbüro");
        assert_eq!(answer.sources.len(), 2);
        assert!(answer.sources[0].contains("Anmeldung"));

        let request = client.last.lock().unwrap().clone().unwrap();
        assert!(request.prompt.contains("How do I register my address?"));
        assert!(request.prompt.contains("[Document 1]\nTitle: Anmeldung"));
        assert!(request.prompt.contains("\n\n---\n\n[Document 2]"));
        assert!(request.prompt.ends_with(FORMATTING_DIRECTIVE));
        assert!(request.system.is_some());
        assert_eq!(request.model, "llama3.2");
        assert_eq!(request.max_tokens, Some(1000));
    }

    #[test]
    fn test_answer_json_shape() {
        let answer = Answer {
            answer_text: "Go to the Bürgerbüro".to_string(),
            sources: vec!["General Info: Anmeldung".to_string()],
        };

        let value = serde_json::to_value(&answer).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "answer_text": "Go to the Bürgerbüro",
                "sources": ["General Info: Anmeldung"]
            })
        );
    }

    #[tokio::test]
    async fn test_override_cannot_drop_directive() {
        let client = Arc::new(RecordingClient::default());
        let prompt = parse_prompt(
            "id: answer\ntitle: Terse\napiVersion: \"1.0\"\ntemplate: \"Q: {{question}}\"\n",
        )
        .unwrap();
        let engine = engine(Arc::clone(&client), 1).await.with_prompt(prompt);

        engine.answer("Mensa opening hours?").await.unwrap();
        let request = client.last.lock().unwrap().clone().unwrap();
        assert!(request.prompt.starts_with("Q: Mensa opening hours?"));
        assert!(request.prompt.ends_with(FORMATTING_DIRECTIVE));
        assert!(request.system.is_none());
    }

    #[tokio::test]
    async fn test_completion_failure_is_opaque() {
        let client = Arc::new(RecordingClient {
            fail: true,
            ..Default::default()
        });
        let engine = engine(Arc::clone(&client), 3).await;

        match engine.answer("Where is the Mensa?").await {
            Err(AppError::Answering(message)) => assert!(!message.contains("503")),
            other => panic!("expected answering error, got {:?}", other),
        }
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_top_k_rejected() {
        let embedder = Arc::new(TrigramProvider::new(16));
        let index = VectorIndex::build(Vec::new(), embedder.as_ref(), 10).await.unwrap();
        let mut options = AnswerOptions::new("llama3.2");
        options.top_k = 0;

        let result = AnsweringEngine::new(
            Arc::new(index),
            embedder,
            Arc::new(RecordingClient::default()),
            options,
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_options_from_config() {
        let config = KnowledgeConfig {
            top_k: 5,
            ..Default::default()
        };
        let options = AnswerOptions::from_config("gpt-4o-mini", &config);
        assert_eq!(options.top_k, 5);
        assert_eq!(options.model, "gpt-4o-mini");
    }
}
