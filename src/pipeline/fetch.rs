//! Conversation fetching. Platform errors are logged and read as "nothing
//! found"; callers decide whether that is fatal.

use tracing::{debug, error};

use crate::slack::{SlackApi, SlackMessage};

/// The single message at `ts`, if Slack returned it.
pub async fn fetch_single_message(slack: &dyn SlackApi, channel: &str, ts: &str) -> Option<SlackMessage> {
    match slack.fetch_message(channel, ts).await {
        Ok(message) => message,
        Err(e) => {
            error!(channel, ts, method = e.method(), error = %e, "Failed to fetch message");
            None
        }
    }
}

/// Every message in the thread, root first. Empty on failure.
pub async fn fetch_thread_replies(slack: &dyn SlackApi, channel: &str, thread_ts: &str) -> Vec<SlackMessage> {
    match slack.fetch_replies(channel, thread_ts).await {
        Ok(messages) => {
            debug!(channel, thread_ts, count = messages.len(), "Fetched thread replies");
            messages
        }
        Err(e) => {
            error!(channel, thread_ts, method = e.method(), error = %e, "Failed to fetch thread replies");
            Vec::new()
        }
    }
}
