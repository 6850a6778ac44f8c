//! Follow-up trigger registration for email threads.

use tracing::{error, info};

use crate::slack::{SlackApi, thread_listener_trigger};

/// The bot's user id via `auth.test`, logged and `None` on failure.
pub async fn resolve_bot_id(slack: &dyn SlackApi) -> Option<String> {
    match slack.bot_user_id().await {
        Ok(id) => Some(id),
        Err(e) => {
            error!(method = e.method(), error = %e, "Failed to resolve bot user id");
            None
        }
    }
}

/// Subscribe the thread workflow to new replies in `thread_ts` that were not
/// written by `bot_id`. Returns the trigger id, or `None` if Slack refused.
pub async fn register_thread_trigger(
    slack: &dyn SlackApi,
    channel: &str,
    thread_ts: &str,
    bot_id: &str,
) -> Option<String> {
    let trigger = thread_listener_trigger(channel, thread_ts, bot_id);
    match slack.create_trigger(&trigger).await {
        Ok(id) => {
            info!(
                channel,
                thread_ts,
                trigger_id = %id,
                filter = %trigger.event.filter.root,
                "Thread trigger registered"
            );
            Some(id)
        }
        Err(e) => {
            error!(channel, thread_ts, method = e.method(), error = %e, "Failed to register thread trigger");
            None
        }
    }
}
