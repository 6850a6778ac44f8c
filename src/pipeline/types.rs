//! Event payloads and invocation results.

use serde::Deserialize;

use crate::slack::MessageHandle;

/// An email was posted to the watched channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailEvent {
    pub channel_id: String,
    /// Timestamp of the message carrying the email file.
    pub message_ts: String,
}

/// A new reply landed in a tracked email thread.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreadEvent {
    pub channel_id: String,
    pub thread_ts: String,
    /// The bot's own user id, used to attribute assistant turns.
    pub bot_id: String,
}

/// What a single invocation managed to do. Steps that failed and were
/// skipped show up as `None`/`false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationReport {
    pub placeholder: Option<MessageHandle>,
    pub reply_posted: bool,
    pub trigger_id: Option<String>,
}
