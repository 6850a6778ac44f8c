//! Completion provider trait and shared HTTP plumbing.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::LlmError;
use crate::prompt::Prompt;

/// One generated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
}

/// A remote language model that turns a [`Prompt`] into text.
///
/// Each implementation picks the prompt encoding its API expects.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name for logs and errors.
    fn provider_name(&self) -> &str;

    /// Model identifier sent with every request.
    fn model_name(&self) -> &str;

    /// Request a single completion.
    async fn complete(&self, prompt: &Prompt) -> Result<Completion, LlmError>;
}

/// Send a request and decode a JSON body, mapping HTTP failures to
/// [`LlmError`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, LlmError> {
    let response = request.send().await.map_err(|e| LlmError::RequestFailed {
        provider: provider.to_string(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| LlmError::RequestFailed {
        provider: provider.to_string(),
        reason: format!("failed to read body: {e}"),
    })?;

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(LlmError::AuthFailed {
            provider: provider.to_string(),
        });
    }
    if !status.is_success() {
        return Err(LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: format!("HTTP {status}: {}", error_message(&body)),
        });
    }

    serde_json::from_str(&body).map_err(|e| LlmError::InvalidResponse {
        provider: provider.to_string(),
        reason: e.to_string(),
    })
}

/// Pull `error.message` out of a vendor error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.chars().take(300).collect())
}
