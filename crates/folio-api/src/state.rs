//! Application state management
//!
//! Author: hephaex@gmail.com

use folio_core::{AppConfig, Result};
use folio_rag::ChatOrchestrator;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Chat orchestrator, built on first use
    orchestrator: OnceCell<Arc<ChatOrchestrator>>,
}

impl AppState {
    /// Create new application state with config
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            orchestrator: OnceCell::new(),
        }
    }

    /// Create state around a ready-made orchestrator
    pub fn with_orchestrator(config: AppConfig, orchestrator: Arc<ChatOrchestrator>) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            orchestrator: OnceCell::new_with(Some(orchestrator)),
        }
    }

    /// Whether a chat-completion credential is configured
    pub fn has_api_key(&self) -> bool {
        self.config.llm.openai_api_key.is_some()
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// The chat orchestrator, wired from config on first call
    pub async fn orchestrator(&self) -> Result<Arc<ChatOrchestrator>> {
        self.orchestrator
            .get_or_try_init(|| async {
                let orchestrator = ChatOrchestrator::from_config(&self.config)?;
                tracing::info!(
                    "Chat orchestrator ready (index {})",
                    self.config.rag.index_path.display()
                );
                Ok::<_, folio_core::FolioError>(Arc::new(orchestrator))
            })
            .await
            .cloned()
    }
}
