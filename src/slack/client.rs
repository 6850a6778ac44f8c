//! Slack Web API client over reqwest.
//!
//! Every method answers `200` with an `{"ok": bool, "error": ...}` envelope.
//! `ok: false` becomes [`SlackError::Api`]; anything that is not JSON or
//! misses the fields we need becomes [`SlackError::InvalidResponse`].

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::trigger::TriggerDefinition;
use super::types::{
    AuthTestResponse, HistoryResponse, MessageHandle, PostMessageResponse, RepliesResponse,
    SlackMessage, TriggerCreateResponse,
};
use super::SlackApi;
use crate::config::{OutboundPolicy, SlackConfig};
use crate::error::{ConfigError, SlackError};

/// Page size requested from `conversations.replies`.
const REPLIES_PAGE_LIMIT: u32 = 200;

/// Maximum pages fetched from `conversations.replies` (50 × 200 = 10,000 replies).
const MAX_REPLY_PAGES: usize = 50;

/// Longest error body echoed back in an error message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Slack Web API client authenticated with a bot token.
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: SecretString,
}

impl SlackClient {
    /// Build a client, refusing an API base outside the outbound allow-list.
    pub fn new(config: &SlackConfig, policy: &OutboundPolicy) -> Result<Self, ConfigError> {
        policy.check_url(&config.api_base)?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("email-response-generator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    /// POST a JSON body (write methods).
    async fn call_json<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, SlackError> {
        let request = self
            .http
            .post(self.method_url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .json(body);
        self.send(method, request).await
    }

    /// POST form-encoded params (read methods).
    async fn call_form<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, SlackError> {
        let request = self
            .http
            .post(self.method_url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .form(params);
        self.send(method, request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SlackError> {
        let response = request.send().await.map_err(|e| SlackError::Http {
            method: method.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| SlackError::Http {
            method: method.to_string(),
            reason: format!("failed to read body: {e}"),
        })?;

        if !status.is_success() {
            return Err(SlackError::Http {
                method: method.to_string(),
                reason: format!("HTTP {status}: {}", truncate(&body, MAX_ERROR_BODY_CHARS)),
            });
        }

        parse_envelope(method, &body)
    }
}

/// Check the `ok` flag and decode the rest of the body into `T`.
fn parse_envelope<T: DeserializeOwned>(method: &str, body: &str) -> Result<T, SlackError> {
    let value: Value = serde_json::from_str(body).map_err(|e| SlackError::InvalidResponse {
        method: method.to_string(),
        reason: format!("not JSON ({e}): {}", truncate(body, MAX_ERROR_BODY_CHARS)),
    })?;

    if !value.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        return Err(SlackError::Api {
            method: method.to_string(),
            error: value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string(),
        });
    }

    if let Some(warning) = value.get("warning").and_then(Value::as_str) {
        debug!(method, warning, "Slack API warning");
    }

    serde_json::from_value(value).map_err(|e| SlackError::InvalidResponse {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{cut}…")
}

/// Discards the body of methods whose success carries nothing we need.
#[derive(serde::Deserialize)]
struct Empty {}

#[async_trait]
impl SlackApi for SlackClient {
    async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<MessageHandle, SlackError> {
        let mut body = json!({
            "channel": channel,
            "text": text,
        });
        if let Some(thread_ts) = thread_ts {
            body["thread_ts"] = Value::String(thread_ts.to_string());
        }

        let response: PostMessageResponse = self.call_json("chat.postMessage", &body).await?;
        Ok(MessageHandle {
            channel: response.channel.unwrap_or_else(|| channel.to_string()),
            ts: response.ts,
        })
    }

    async fn update_message(&self, handle: &MessageHandle, text: &str) -> Result<(), SlackError> {
        let body = json!({
            "channel": handle.channel,
            "ts": handle.ts,
            "text": text,
            "mrkdwn": true,
        });
        let _: Empty = self.call_json("chat.update", &body).await?;
        Ok(())
    }

    async fn fetch_message(&self, channel: &str, ts: &str) -> Result<Option<SlackMessage>, SlackError> {
        let params = [
            ("channel", channel.to_string()),
            ("oldest", ts.to_string()),
            ("latest", ts.to_string()),
            ("inclusive", "true".to_string()),
            ("limit", "1".to_string()),
        ];
        let response: HistoryResponse = self.call_form("conversations.history", &params).await?;
        Ok(response.messages.into_iter().next())
    }

    async fn fetch_replies(&self, channel: &str, thread_ts: &str) -> Result<Vec<SlackMessage>, SlackError> {
        let mut messages = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 0..MAX_REPLY_PAGES {
            let mut params = vec![
                ("channel", channel.to_string()),
                ("ts", thread_ts.to_string()),
                ("limit", REPLIES_PAGE_LIMIT.to_string()),
            ];
            if let Some(ref next) = cursor {
                params.push(("cursor", next.clone()));
            }

            let response: RepliesResponse = self.call_form("conversations.replies", &params).await?;
            messages.extend(response.messages);

            cursor = response
                .response_metadata
                .and_then(|m| m.next_cursor)
                .filter(|c| !c.is_empty());
            if cursor.is_none() {
                return Ok(messages);
            }
            debug!(channel, thread_ts, page, "Fetching next page of thread replies");
        }

        warn!(
            channel,
            thread_ts,
            fetched = messages.len(),
            "conversations.replies reached page limit; thread may be incomplete"
        );
        Ok(messages)
    }

    async fn bot_user_id(&self) -> Result<String, SlackError> {
        let response: AuthTestResponse = self.call_json("auth.test", &json!({})).await?;
        if response.user_id.trim().is_empty() {
            return Err(SlackError::InvalidResponse {
                method: "auth.test".to_string(),
                reason: "empty user_id".to_string(),
            });
        }
        Ok(response.user_id)
    }

    async fn create_trigger(&self, trigger: &TriggerDefinition) -> Result<String, SlackError> {
        let body = serde_json::to_value(trigger).map_err(|e| SlackError::InvalidResponse {
            method: "workflows.triggers.create".to_string(),
            reason: format!("failed to encode trigger: {e}"),
        })?;
        let response: TriggerCreateResponse = self.call_json("workflows.triggers.create", &body).await?;
        Ok(response.trigger.id)
    }

    async fn complete_function_success(
        &self,
        function_execution_id: &str,
        outputs: Value,
    ) -> Result<(), SlackError> {
        let body = json!({
            "function_execution_id": function_execution_id,
            "outputs": outputs,
        });
        let _: Empty = self.call_json("functions.completeSuccess", &body).await?;
        Ok(())
    }

    async fn complete_function_error(
        &self,
        function_execution_id: &str,
        error: &str,
    ) -> Result<(), SlackError> {
        let body = json!({
            "function_execution_id": function_execution_id,
            "error": error,
        });
        let _: Empty = self.call_json("functions.completeError", &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_base: &str) -> SlackConfig {
        SlackConfig {
            bot_token: SecretString::from("xoxb-test"),
            api_base: api_base.to_string(),
        }
    }

    #[test]
    fn new_rejects_api_base_outside_allow_list() {
        let err = SlackClient::new(&config("https://slack.example.net/api"), &OutboundPolicy::default())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::DomainNotAllowed { .. }));
    }

    #[test]
    fn method_url_joins_base_and_method() {
        let client = SlackClient::new(&config("https://slack.com/api/"), &OutboundPolicy::default()).unwrap();
        assert_eq!(client.method_url("chat.update"), "https://slack.com/api/chat.update");
    }

    #[test]
    fn envelope_not_ok_maps_to_api_error() {
        let err = parse_envelope::<Empty>("chat.update", r#"{"ok":false,"error":"cant_update_message"}"#)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SlackError::Api { ref method, ref error } if method == "chat.update" && error == "cant_update_message"
        ));
    }

    #[test]
    fn envelope_missing_ok_is_api_error() {
        let err = parse_envelope::<Empty>("auth.test", "{}").err().unwrap();
        assert!(matches!(err, SlackError::Api { ref error, .. } if error == "unknown_error"));
    }

    #[test]
    fn envelope_non_json_is_invalid_response() {
        let err = parse_envelope::<Empty>("auth.test", "<html>").err().unwrap();
        assert!(matches!(err, SlackError::InvalidResponse { .. }));
    }

    #[test]
    fn envelope_missing_field_is_invalid_response() {
        let err = parse_envelope::<PostMessageResponse>("chat.postMessage", r#"{"ok":true}"#)
            .err()
            .unwrap();
        assert!(matches!(err, SlackError::InvalidResponse { .. }));
    }

    #[test]
    fn envelope_ok_decodes_body() {
        let response: PostMessageResponse =
            parse_envelope("chat.postMessage", r#"{"ok":true,"channel":"C1","ts":"200.5"}"#).unwrap();
        assert_eq!(response.ts, "200.5");
        assert_eq!(response.channel.as_deref(), Some("C1"));
    }

    #[test]
    fn truncate_long_bodies() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
