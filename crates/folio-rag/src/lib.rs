//! Folio RAG - Retrieval-Augmented chat orchestrator
//!
//! Answers questions about the site owner:
//! - Retrieves the most similar corpus chunks for the latest question
//! - Wraps them in persona rules and the trimmed conversation
//! - Calls chat models in fallback order, moving on only when throttled
//! - Appends at most one call-to-action link to the reply
//!
//! Author: hephaex@gmail.com

use folio_core::{
    AppConfig, ChatAnswer, ChatMessage, CompletionRequest, FolioError, LlmClient, PersonaConfig,
    Result, Role, SearchBackend,
};
use folio_vector::{JsonVectorStore, QueryEmbedder, VectorRetriever};
use std::sync::Arc;
use std::time::Duration;

pub mod cta;
pub mod fallback;
pub mod llm;
pub mod prompt;

pub use cta::{append_call_to_action, call_to_action};
pub use fallback::{complete_with_fallback, ModelReply};
pub use llm::OpenAiClient;
pub use prompt::{format_context, PromptBuilder};

/// Reply used when the model returns no text
pub const EMPTY_REPLY: &str = "Sorry, I could not generate a response.";

// ============================================================================
// Configuration
// ============================================================================

/// Chat orchestrator configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Models to try, in order
    pub models: Vec<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion length cap
    pub max_tokens: Option<u32>,

    /// Chunks retrieved per question
    pub top_k: usize,

    /// Conversation messages kept in the prompt
    pub max_history: usize,

    /// Deadline for each model call
    pub timeout: Duration,

    /// Who the assistant answers about
    pub persona: PersonaConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

impl ChatConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            models: config.llm.models.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            top_k: config.rag.top_k,
            max_history: config.rag.max_history,
            timeout: Duration::from_secs(config.llm.timeout_secs),
            persona: config.persona.clone(),
        }
    }
}

// ============================================================================
// Conversation helpers
// ============================================================================

/// Content of the most recent user message, if it has any text
pub fn latest_user_message(history: &[ChatMessage]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .filter(|content| !content.trim().is_empty())
}

/// Keep the last `max_history` user and assistant messages
///
/// At least one message is always kept so the latest question reaches the
/// model.
pub fn trim_history(history: &[ChatMessage], max_history: usize) -> Vec<ChatMessage> {
    let conversation: Vec<&ChatMessage> = history
        .iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant))
        .collect();
    let skip = conversation.len().saturating_sub(max_history.max(1));
    conversation.into_iter().skip(skip).cloned().collect()
}

// ============================================================================
// Chat Orchestrator
// ============================================================================

/// Retrieval-augmented chat orchestrator
pub struct ChatOrchestrator {
    /// Corpus retriever
    retriever: Arc<dyn SearchBackend>,

    /// Chat-completion client
    llm_client: Arc<dyn LlmClient>,

    /// Configuration
    config: ChatConfig,
}

impl ChatOrchestrator {
    /// Create a new orchestrator
    pub fn new(
        retriever: Arc<dyn SearchBackend>,
        llm_client: Arc<dyn LlmClient>,
        config: ChatConfig,
    ) -> Self {
        Self {
            retriever,
            llm_client,
            config,
        }
    }

    /// Wire the JSON-index retriever and the OpenAI client from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let llm_client = OpenAiClient::from_config(&config.llm)?;
        let store = Arc::new(JsonVectorStore::new(config.rag.index_path.clone()));
        let embedder = Arc::new(QueryEmbedder::from_config(&config.embedding, &config.llm));
        let retriever = VectorRetriever::new(store, embedder);

        Ok(Self::new(
            Arc::new(retriever),
            Arc::new(llm_client),
            ChatConfig::from_app_config(config),
        ))
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Answer the latest user message in `history`
    pub async fn answer(&self, history: &[ChatMessage]) -> Result<ChatAnswer> {
        let question = latest_user_message(history)
            .ok_or_else(|| FolioError::ValidationError("no user message".to_string()))?;

        tracing::info!("Chat request with {} messages", history.len());

        let chunks = self.retriever.search(question, self.config.top_k).await?;
        tracing::debug!(
            "{} returned {} chunks",
            self.retriever.name(),
            chunks.len()
        );

        let messages = PromptBuilder::new(&self.config.persona)
            .context(&chunks)
            .history(trim_history(history, self.config.max_history))
            .build();

        let request = CompletionRequest {
            model: String::new(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let ModelReply { model, completion } = complete_with_fallback(
            self.llm_client.as_ref(),
            &self.config.models,
            request,
            self.config.timeout,
        )
        .await?;

        let usage = completion.usage;
        tracing::info!(
            "Model: {}, Tokens - Prompt: {}, Completion: {}, Total: {}",
            model,
            usage.prompt,
            usage.completion,
            usage.total
        );

        let base_reply = completion
            .content
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| EMPTY_REPLY.to_string());

        Ok(ChatAnswer {
            reply: append_call_to_action(question, &base_reply),
            model,
            usage,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use folio_core::{
        Chunk, Completion, CompletionError, ScoredChunk, TokenUsage,
    };
    use std::sync::Mutex;

    struct FixedRetriever {
        queries: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl SearchBackend for FixedRetriever {
        async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredChunk>> {
            self.queries.lock().unwrap().push((query.to_string(), limit));
            Ok(vec![ScoredChunk {
                chunk: Chunk {
                    id: "data/rag/projects.md:0".to_string(),
                    source: "data/rag/projects.md".to_string(),
                    text: "Built a ray tracer in Rust.".to_string(),
                    embedding: vec![1.0],
                },
                score: 0.9,
            }])
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    /// Records prompts and replies with a canned completion
    struct RecordingClient {
        reply: Option<String>,
        prompts: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl LlmClient for RecordingClient {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> std::result::Result<Completion, CompletionError> {
            self.prompts.lock().unwrap().push(request.clone());
            Ok(Completion {
                content: self.reply.clone(),
                usage: TokenUsage {
                    prompt: 100,
                    completion: 20,
                    total: 120,
                },
            })
        }
    }

    fn orchestrator(
        reply: Option<&str>,
    ) -> (ChatOrchestrator, Arc<FixedRetriever>, Arc<RecordingClient>) {
        let retriever = Arc::new(FixedRetriever {
            queries: Mutex::new(Vec::new()),
        });
        let client = Arc::new(RecordingClient {
            reply: reply.map(str::to_string),
            prompts: Mutex::new(Vec::new()),
        });
        let orchestrator = ChatOrchestrator::new(
            retriever.clone(),
            client.clone(),
            ChatConfig::default(),
        );
        (orchestrator, retriever, client)
    }

    #[test]
    fn test_latest_user_message() {
        let history = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("answer"),
            ChatMessage::user("second"),
            ChatMessage::assistant("trailing"),
        ];
        assert_eq!(latest_user_message(&history), Some("second"));
        assert_eq!(latest_user_message(&[ChatMessage::user("  ")]), None);
        assert_eq!(latest_user_message(&[]), None);
    }

    #[test]
    fn test_trim_history() {
        let history: Vec<ChatMessage> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user(i.to_string())
                } else {
                    ChatMessage::assistant(i.to_string())
                }
            })
            .chain(std::iter::once(ChatMessage::system("ignored")))
            .collect();

        let trimmed = trim_history(&history, 6);
        let contents: Vec<_> = trimmed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["4", "5", "6", "7", "8", "9"]);
        assert_eq!(trim_history(&history[..2], 6).len(), 2);

        let last = trim_history(&history, 0);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].content, "9");
    }

    #[tokio::test]
    async fn test_answer_appends_projects_link() {
        let (orchestrator, retriever, client) = orchestrator(Some("I built a ray tracer."));

        let answer = orchestrator
            .answer(&[ChatMessage::user("What projects have you built?")])
            .await
            .unwrap();

        assert_eq!(
            answer.reply,
            "I built a ray tracer.\n\nExplore more in [Projects](/projects)."
        );
        assert_eq!(answer.model, "gpt-4o-mini");
        assert_eq!(answer.usage.total, 120);

        let queries = retriever.queries.lock().unwrap();
        assert_eq!(queries[0], ("What projects have you built?".to_string(), 3));

        let prompts = client.prompts.lock().unwrap();
        let messages = &prompts[0].messages;
        assert_eq!(messages.len(), 4);
        assert!(messages[1].content.starts_with("This is your first reply"));
        assert!(messages[2].content.contains("Chunk 1 (data/rag/projects.md):"));
        assert_eq!(prompts[0].temperature, 0.4);
    }

    #[tokio::test]
    async fn test_empty_completion_uses_apology() {
        let (orchestrator, _, _) = orchestrator(None);
        let answer = orchestrator
            .answer(&[ChatMessage::user("hello")])
            .await
            .unwrap();
        assert_eq!(answer.reply, EMPTY_REPLY);
    }

    #[tokio::test]
    async fn test_follow_up_forbids_introduction() {
        let (orchestrator, _, client) = orchestrator(Some("Sure."));
        orchestrator
            .answer(&[
                ChatMessage::user("hi"),
                ChatMessage::assistant("Hi! I'm the assistant."),
                ChatMessage::user("what else?"),
            ])
            .await
            .unwrap();

        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].messages[1]
            .content
            .starts_with("Do not introduce yourself again"));
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected_before_any_call() {
        let (orchestrator, retriever, client) = orchestrator(Some("unused"));
        let err = orchestrator
            .answer(&[ChatMessage::assistant("hello"), ChatMessage::user("   ")])
            .await
            .unwrap_err();

        assert!(matches!(err, FolioError::ValidationError(_)));
        assert!(retriever.queries.lock().unwrap().is_empty());
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_history_still_sends_question() {
        let (_, retriever, client) = orchestrator(Some("Sure."));
        let config = ChatConfig {
            max_history: 0,
            ..ChatConfig::default()
        };
        let orchestrator = ChatOrchestrator::new(retriever, client.clone(), config);

        orchestrator
            .answer(&[
                ChatMessage::user("hi"),
                ChatMessage::assistant("Hello!"),
                ChatMessage::user("What projects has she built?"),
            ])
            .await
            .unwrap();

        let prompts = client.prompts.lock().unwrap();
        let last = prompts[0].messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, "What projects has she built?");
    }

    #[test]
    fn test_from_config_requires_key() {
        let err = ChatOrchestrator::from_config(&AppConfig::default()).err();
        assert!(matches!(err, Some(FolioError::ConfigError(_))));
    }
}
