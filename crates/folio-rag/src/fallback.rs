//! Ordered model fallback
//!
//! Models are tried in order. Only a rate-limited model hands over to the
//! next one; any other failure ends the attempt immediately. Each call runs
//! under a deadline and an expired deadline is reported as `Timeout`.
//!
//! Author: hephaex@gmail.com

use folio_core::{Completion, CompletionError, CompletionRequest, FolioError, LlmClient, Result};
use std::time::Duration;

/// A completion together with the model that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub model: String,
    pub completion: Completion,
}

/// Run `request` against each of `models` until one answers
///
/// The request's own `model` field is ignored.
pub async fn complete_with_fallback(
    client: &dyn LlmClient,
    models: &[String],
    mut request: CompletionRequest,
    deadline: Duration,
) -> Result<ModelReply> {
    if models.is_empty() {
        return Err(FolioError::ConfigError(
            "no chat models configured".to_string(),
        ));
    }

    let mut last_error: Option<CompletionError> = None;

    for model in models {
        tracing::info!("Trying {}...", model);
        request.model = model.clone();

        match tokio::time::timeout(deadline, client.complete(&request)).await {
            Ok(Ok(completion)) => {
                tracing::info!("Successfully used {}", model);
                return Ok(ModelReply {
                    model: model.clone(),
                    completion,
                });
            }
            Ok(Err(e)) if e.is_rate_limited() => {
                tracing::warn!("Rate limited on {}, trying next model: {}", model, e);
                last_error = Some(e);
            }
            Ok(Err(e)) => {
                tracing::error!("Non-rate-limit error on {}: {}", model, e);
                return Err(FolioError::ModelsExhausted(format!("{model}: {e}")));
            }
            Err(_) => {
                tracing::error!("{} did not respond within {:?}", model, deadline);
                return Err(FolioError::Timeout {
                    model: model.clone(),
                    seconds: deadline.as_secs(),
                });
            }
        }
    }

    let detail = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no model answered".to_string());
    tracing::error!("All models failed: {}", detail);
    Err(FolioError::ModelsExhausted(detail))
}
