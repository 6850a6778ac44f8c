//! Slack Web API payload types.

use serde::{Deserialize, Serialize};

/// A message as returned by `conversations.history` / `conversations.replies`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackMessage {
    /// Author user id. Absent for some bot and integration messages.
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub files: Vec<SlackFile>,
}

impl SlackMessage {
    /// The author's user id, used for role attribution.
    pub fn author(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Extracted plain text of the first attached file (the email body).
    pub fn document_text(&self) -> Option<&str> {
        self.files.first()?.plain_text.as_deref()
    }
}

/// A file attached to a message. Email files carry their extracted body in
/// `plain_text`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackFile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub filetype: Option<String>,
    #[serde(default)]
    pub plain_text: Option<String>,
}

/// Identifies a posted message so it can be edited later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub channel: String,
    pub ts: String,
}

// ── Response bodies ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct PostMessageResponse {
    #[serde(default)]
    pub channel: Option<String>,
    pub ts: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryResponse {
    #[serde(default)]
    pub messages: Vec<SlackMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepliesResponse {
    #[serde(default)]
    pub messages: Vec<SlackMessage>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthTestResponse {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TriggerCreateResponse {
    pub trigger: CreatedTrigger,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedTrigger {
    pub id: String,
}
