//! "Thread reply received" pipeline.

use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::types::{InvocationReport, ThreadEvent};
use super::{Responder, ack, fetch};
use crate::error::PipelineError;
use crate::prompt::build_thread_prompt;

impl Responder {
    /// Answer the latest reply in a tracked thread. Never registers a trigger;
    /// the one created for the email already matches every later reply.
    pub async fn handle_thread_reply(&self, event: &ThreadEvent) -> Result<InvocationReport, PipelineError> {
        let span = info_span!(
            "thread_invocation",
            invocation_id = %Uuid::new_v4(),
            channel = %event.channel_id,
            thread_ts = %event.thread_ts,
        );
        self.run_thread(event).instrument(span).await
    }

    async fn run_thread(&self, event: &ThreadEvent) -> Result<InvocationReport, PipelineError> {
        let slack = self.slack.as_ref();
        let channel = event.channel_id.as_str();
        let thread_ts = event.thread_ts.as_str();
        let mut report = InvocationReport::default();

        report.placeholder =
            ack::post_placeholder(slack, channel, thread_ts, &self.config.placeholder_text).await;

        let mut messages = fetch::fetch_thread_replies(slack, channel, thread_ts).await;
        if let Some(handle) = &report.placeholder {
            messages.retain(|m| m.ts != handle.ts);
        }

        let prompt = build_thread_prompt(&messages, &event.bot_id, self.config.role_attribution);
        info!(
            model = self.llm.model_name(),
            turns = prompt.len(),
            "Requesting thread reply"
        );
        let completion = self.llm.complete(&prompt).await?;

        report.reply_posted = match &report.placeholder {
            Some(handle) => ack::update_placeholder(slack, handle, &completion.text).await,
            None => {
                warn!("No placeholder to update; reply was not posted");
                false
            }
        };

        info!(reply_posted = report.reply_posted, "Thread invocation finished");
        Ok(report)
    }
}
