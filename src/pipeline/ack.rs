//! Placeholder posting and in-place update.
//!
//! Both steps log failures and let the pipeline carry on.

use tracing::{debug, error};

use crate::slack::{MessageHandle, SlackApi};

/// Post the "thinking" message into the thread. `None` if Slack refused it.
pub async fn post_placeholder(
    slack: &dyn SlackApi,
    channel: &str,
    thread_ts: &str,
    text: &str,
) -> Option<MessageHandle> {
    match slack.post_message(channel, Some(thread_ts), text).await {
        Ok(handle) => {
            debug!(channel, thread_ts, placeholder_ts = %handle.ts, "Placeholder posted");
            Some(handle)
        }
        Err(e) => {
            error!(channel, thread_ts, method = e.method(), error = %e, "Failed to post placeholder");
            None
        }
    }
}

/// Replace the placeholder text with the reply. Returns whether Slack accepted it.
pub async fn update_placeholder(slack: &dyn SlackApi, handle: &MessageHandle, text: &str) -> bool {
    match slack.update_message(handle, text).await {
        Ok(()) => {
            debug!(channel = %handle.channel, ts = %handle.ts, "Placeholder updated with reply");
            true
        }
        Err(e) => {
            error!(
                channel = %handle.channel,
                ts = %handle.ts,
                method = e.method(),
                error = %e,
                "Failed to update placeholder"
            );
            false
        }
    }
}
