//! Anthropic text completions (`/v1/complete`).
//!
//! Takes the transcript encoding: `\n\nHuman: ...\n\nAssistant:`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{Completion, CompletionProvider, send_json};
use crate::error::LlmError;
use crate::prompt::Prompt;

const PROVIDER: &str = "anthropic";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct CompleteRequest<'a> {
    model: &'a str,
    prompt: String,
    max_tokens_to_sample: u32,
}

#[derive(Debug, Deserialize)]
struct CompleteResponse {
    completion: String,
    #[serde(default)]
    stop_reason: Option<String>,
}

/// Client for Anthropic's text completion endpoint.
pub struct AnthropicCompletions {
    http: reqwest::Client,
    api_base: String,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
}

impl AnthropicCompletions {
    pub fn new(
        http: reqwest::Client,
        api_base: &str,
        api_key: SecretString,
        model: &str,
        max_tokens: u32,
    ) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            max_tokens,
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicCompletions {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &Prompt) -> Result<Completion, LlmError> {
        let body = CompleteRequest {
            model: &self.model,
            prompt: prompt.to_transcript(),
            max_tokens_to_sample: self.max_tokens,
        };

        let request = self
            .http
            .post(format!("{}/v1/complete", self.api_base))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let response: CompleteResponse = send_json(PROVIDER, request).await?;
        debug!(
            model = %self.model,
            stop_reason = response.stop_reason.as_deref().unwrap_or("unknown"),
            "Anthropic completion received"
        );

        Ok(Completion {
            text: response.completion.trim().to_string(),
        })
    }
}
