//! In-memory Slack and LLM stubs that record every call in order.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{LlmError, SlackError};
use crate::llm::{Completion, CompletionProvider};
use crate::prompt::Prompt;
use crate::slack::{MessageHandle, SlackApi, SlackFile, SlackMessage, TriggerDefinition};

pub const BOT_ID: &str = "U_BOT";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    PostMessage {
        channel: String,
        thread_ts: Option<String>,
        text: String,
    },
    UpdateMessage {
        handle: MessageHandle,
        text: String,
    },
    FetchMessage {
        channel: String,
        ts: String,
    },
    FetchReplies {
        channel: String,
        thread_ts: String,
    },
    AuthTest,
    CreateTrigger(TriggerDefinition),
    Complete(Prompt),
    CompleteSuccess(String),
    CompleteError(String, String),
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

fn api_error(method: &str, error: &str) -> SlackError {
    SlackError::Api {
        method: method.to_string(),
        error: error.to_string(),
    }
}

/// Stub [`SlackApi`] with switchable failures.
#[derive(Default)]
pub struct RecordingSlack {
    log: CallLog,
    history: Vec<SlackMessage>,
    replies: Vec<SlackMessage>,
    fail_post: bool,
    fail_update: bool,
    fail_fetch: bool,
    fail_auth: bool,
    fail_trigger: bool,
}

impl RecordingSlack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn with_history(mut self, messages: Vec<SlackMessage>) -> Self {
        self.history = messages;
        self
    }

    pub fn with_replies(mut self, messages: Vec<SlackMessage>) -> Self {
        self.replies = messages;
        self
    }

    pub fn failing_post(mut self) -> Self {
        self.fail_post = true;
        self
    }

    pub fn failing_update(mut self) -> Self {
        self.fail_update = true;
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn failing_auth(mut self) -> Self {
        self.fail_auth = true;
        self
    }

    pub fn failing_trigger(mut self) -> Self {
        self.fail_trigger = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }

    fn post_count(&self) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, Call::PostMessage { .. }))
            .count()
    }
}

#[async_trait]
impl SlackApi for RecordingSlack {
    async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<MessageHandle, SlackError> {
        self.record(Call::PostMessage {
            channel: channel.to_string(),
            thread_ts: thread_ts.map(String::from),
            text: text.to_string(),
        });
        if self.fail_post {
            return Err(api_error("chat.postMessage", "channel_not_found"));
        }
        Ok(MessageHandle {
            channel: channel.to_string(),
            ts: format!("900.{}", self.post_count()),
        })
    }

    async fn update_message(&self, handle: &MessageHandle, text: &str) -> Result<(), SlackError> {
        self.record(Call::UpdateMessage {
            handle: handle.clone(),
            text: text.to_string(),
        });
        if self.fail_update {
            return Err(api_error("chat.update", "cant_update_message"));
        }
        Ok(())
    }

    async fn fetch_message(&self, channel: &str, ts: &str) -> Result<Option<SlackMessage>, SlackError> {
        self.record(Call::FetchMessage {
            channel: channel.to_string(),
            ts: ts.to_string(),
        });
        if self.fail_fetch {
            return Err(api_error("conversations.history", "not_in_channel"));
        }
        Ok(self.history.first().cloned())
    }

    async fn fetch_replies(&self, channel: &str, thread_ts: &str) -> Result<Vec<SlackMessage>, SlackError> {
        self.record(Call::FetchReplies {
            channel: channel.to_string(),
            thread_ts: thread_ts.to_string(),
        });
        if self.fail_fetch {
            return Err(api_error("conversations.replies", "thread_not_found"));
        }
        Ok(self.replies.clone())
    }

    async fn bot_user_id(&self) -> Result<String, SlackError> {
        self.record(Call::AuthTest);
        if self.fail_auth {
            return Err(api_error("auth.test", "invalid_auth"));
        }
        Ok(BOT_ID.to_string())
    }

    async fn create_trigger(&self, trigger: &TriggerDefinition) -> Result<String, SlackError> {
        self.record(Call::CreateTrigger(trigger.clone()));
        if self.fail_trigger {
            return Err(api_error("workflows.triggers.create", "invalid_trigger_inputs"));
        }
        Ok("Ft0001".to_string())
    }

    async fn complete_function_success(
        &self,
        function_execution_id: &str,
        _outputs: serde_json::Value,
    ) -> Result<(), SlackError> {
        self.record(Call::CompleteSuccess(function_execution_id.to_string()));
        Ok(())
    }

    async fn complete_function_error(
        &self,
        function_execution_id: &str,
        error: &str,
    ) -> Result<(), SlackError> {
        self.record(Call::CompleteError(
            function_execution_id.to_string(),
            error.to_string(),
        ));
        Ok(())
    }
}

/// Stub LLM that returns a fixed reply, or fails.
pub struct StubLlm {
    log: CallLog,
    reply: Result<String, ()>,
}

impl StubLlm {
    pub fn replying(log: CallLog, text: &str) -> Self {
        Self {
            log,
            reply: Ok(text.to_string()),
        }
    }

    pub fn failing(log: CallLog) -> Self {
        Self { log, reply: Err(()) }
    }
}

#[async_trait]
impl CompletionProvider for StubLlm {
    fn provider_name(&self) -> &str {
        "stub"
    }

    fn model_name(&self) -> &str {
        "stub-model"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<Completion, LlmError> {
        self.log.lock().unwrap().push(Call::Complete(prompt.clone()));
        match &self.reply {
            Ok(text) => Ok(Completion { text: text.clone() }),
            Err(()) => Err(LlmError::RequestFailed {
                provider: "stub".to_string(),
                reason: "HTTP 529: overloaded".to_string(),
            }),
        }
    }
}

pub fn email_message(ts: &str, plain_text: &str) -> SlackMessage {
    SlackMessage {
        user: Some("U_MAILER".to_string()),
        ts: ts.to_string(),
        files: vec![SlackFile {
            id: "F_EMAIL".to_string(),
            filetype: Some("email".to_string()),
            plain_text: Some(plain_text.to_string()),
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn reply(user: &str, ts: &str, text: &str) -> SlackMessage {
    SlackMessage {
        user: Some(user.to_string()),
        ts: ts.to_string(),
        text: text.to_string(),
        ..Default::default()
    }
}
