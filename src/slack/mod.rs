//! Slack Web API access.
//!
//! The pipelines talk to Slack only through the [`SlackApi`] trait so they can
//! run against the real HTTP client or an in-memory stub.

pub mod client;
pub mod trigger;
pub mod types;

pub use client::SlackClient;
pub use trigger::{TriggerDefinition, thread_listener_trigger};
pub use types::{MessageHandle, SlackFile, SlackMessage};

use async_trait::async_trait;

use crate::error::SlackError;

/// The Slack Web API methods this service calls.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// `chat.postMessage`, optionally into a thread.
    async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<MessageHandle, SlackError>;

    /// `chat.update` on a previously posted message.
    async fn update_message(&self, handle: &MessageHandle, text: &str) -> Result<(), SlackError>;

    /// `conversations.history` bounded to the single message at `ts`.
    async fn fetch_message(&self, channel: &str, ts: &str) -> Result<Option<SlackMessage>, SlackError>;

    /// `conversations.replies`, every page. The root message comes first.
    async fn fetch_replies(&self, channel: &str, thread_ts: &str) -> Result<Vec<SlackMessage>, SlackError>;

    /// `auth.test`: the bot's own user id.
    async fn bot_user_id(&self) -> Result<String, SlackError>;

    /// `workflows.triggers.create`; returns the new trigger's id.
    async fn create_trigger(&self, trigger: &TriggerDefinition) -> Result<String, SlackError>;

    /// `functions.completeSuccess` for a custom function execution.
    async fn complete_function_success(
        &self,
        function_execution_id: &str,
        outputs: serde_json::Value,
    ) -> Result<(), SlackError>;

    /// `functions.completeError` for a custom function execution.
    async fn complete_function_error(
        &self,
        function_execution_id: &str,
        error: &str,
    ) -> Result<(), SlackError>;
}
