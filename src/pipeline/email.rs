//! "Email received" pipeline.

use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::types::{EmailEvent, InvocationReport};
use super::{Responder, ack, fetch, registrar};
use crate::error::PipelineError;
use crate::prompt::build_email_prompt;

impl Responder {
    /// Reply to a freshly posted email and start listening on its thread.
    pub async fn handle_email(&self, event: &EmailEvent) -> Result<InvocationReport, PipelineError> {
        let span = info_span!(
            "email_invocation",
            invocation_id = %Uuid::new_v4(),
            channel = %event.channel_id,
            message_ts = %event.message_ts,
        );
        self.run_email(event).instrument(span).await
    }

    async fn run_email(&self, event: &EmailEvent) -> Result<InvocationReport, PipelineError> {
        let slack = self.slack.as_ref();
        let channel = event.channel_id.as_str();
        let ts = event.message_ts.as_str();
        let mut report = InvocationReport::default();

        report.placeholder = ack::post_placeholder(slack, channel, ts, &self.config.placeholder_text).await;

        let message = fetch::fetch_single_message(slack, channel, ts).await;
        let email_text = message
            .as_ref()
            .and_then(|m| m.document_text())
            .ok_or_else(|| {
                PipelineError::MissingData(format!("message {ts} in {channel} has no email text"))
            })?;

        let prompt = build_email_prompt(email_text);
        info!(
            model = self.llm.model_name(),
            email_chars = email_text.chars().count(),
            "Requesting email reply"
        );
        let completion = self.llm.complete(&prompt).await?;

        report.reply_posted = match &report.placeholder {
            Some(handle) => ack::update_placeholder(slack, handle, &completion.text).await,
            None => {
                warn!("No placeholder to update; reply was not posted");
                false
            }
        };

        if let Some(bot_id) = registrar::resolve_bot_id(slack).await {
            report.trigger_id = registrar::register_thread_trigger(slack, channel, ts, &bot_id).await;
        }

        info!(
            reply_posted = report.reply_posted,
            trigger_registered = report.trigger_id.is_some(),
            "Email invocation finished"
        );
        Ok(report)
    }
}
