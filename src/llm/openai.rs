//! OpenAI chat completions via rig-core.
//!
//! [`SYSTEM_INSTRUCTION`] is the preamble. Every turn but the last becomes
//! chat history and the last one is the prompt.

use async_trait::async_trait;
use rig::completion::{CompletionError, CompletionModel};
use rig::message::{AssistantContent, Message, UserContent};
use rig::one_or_many::OneOrMany;
use tracing::debug;

use super::provider::{Completion, CompletionProvider};
use crate::error::LlmError;
use crate::prompt::{Prompt, Role, SYSTEM_INSTRUCTION, Turn};

const PROVIDER: &str = "openai";

/// Chat completion provider over any rig [`CompletionModel`].
pub struct OpenAiChat<M> {
    model: M,
    model_name: String,
    max_tokens: u32,
}

impl<M: CompletionModel> OpenAiChat<M> {
    pub fn new(model: M, model_name: &str, max_tokens: u32) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            max_tokens,
        }
    }
}

fn to_message(turn: &Turn) -> Message {
    match turn.role {
        Role::Human => Message::User {
            content: OneOrMany::one(UserContent::text(turn.text.as_str())),
        },
        Role::Assistant => Message::Assistant {
            id: None,
            content: OneOrMany::one(AssistantContent::text(turn.text.as_str())),
        },
    }
}

/// Split a prompt into rig's (prompt, history) pair. An empty prompt asks
/// with the system instruction itself.
fn split_prompt(prompt: &Prompt) -> (Message, Vec<Message>) {
    match prompt.turns().split_last() {
        Some((last, history)) => (to_message(last), history.iter().map(to_message).collect()),
        None => (to_message(&Turn::human(SYSTEM_INSTRUCTION)), Vec::new()),
    }
}

fn map_error(err: CompletionError) -> LlmError {
    match err {
        CompletionError::ResponseError(reason) => LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason,
        },
        other => LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl<M> CompletionProvider for OpenAiChat<M>
where
    M: CompletionModel + 'static,
{
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, prompt: &Prompt) -> Result<Completion, LlmError> {
        let (message, history) = split_prompt(prompt);

        let response = self
            .model
            .completion_request(message)
            .preamble(SYSTEM_INSTRUCTION.to_string())
            .messages(history)
            .max_tokens(u64::from(self.max_tokens))
            .send()
            .await
            .map_err(map_error)?;

        let text: String = response
            .choice
            .iter()
            .filter_map(|content| match content {
                AssistantContent::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect();
        if text.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "no text content in choice".to_string(),
            });
        }

        debug!(model = %self.model_name, chars = text.len(), "OpenAI completion received");
        Ok(Completion {
            text: text.trim().to_string(),
        })
    }
}
