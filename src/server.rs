//! Events API endpoint and service routes.
//!
//! Slack delivers each custom function run as a `function_executed` event.
//! The endpoint answers right away and runs the pipeline on its own task,
//! then reports the outcome with `functions.completeSuccess` or
//! `functions.completeError`. Tasks are tracked in [`Invocations`] so a
//! shutdown can wait for every outcome to be reported.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::{JoinError, JoinSet};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::error::PipelineError;
use crate::manifest::{APP_NAME, EMAIL_FUNCTION_CALLBACK_ID, THREAD_FUNCTION_CALLBACK_ID};
use crate::pipeline::{EmailEvent, InvocationReport, Responder, ThreadEvent};
use crate::slack::SlackApi;

/// Outer Events API envelope.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EventEnvelope {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        event: CallbackEvent,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CallbackEvent {
    FunctionExecuted {
        function: FunctionRef,
        #[serde(default)]
        inputs: Value,
        function_execution_id: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct FunctionRef {
    callback_id: String,
}

/// A function run this service knows how to handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Email(EmailEvent),
    Thread(ThreadEvent),
}

impl Invocation {
    /// Map a function callback id and its inputs to an invocation.
    /// `Ok(None)` for functions that belong to someone else.
    pub fn from_function(callback_id: &str, inputs: Value) -> Result<Option<Self>, PipelineError> {
        let invalid = |e: serde_json::Error| PipelineError::InvalidInputs(format!("{callback_id}: {e}"));
        let invocation = match callback_id {
            EMAIL_FUNCTION_CALLBACK_ID => Self::Email(serde_json::from_value(inputs).map_err(invalid)?),
            THREAD_FUNCTION_CALLBACK_ID => Self::Thread(serde_json::from_value(inputs).map_err(invalid)?),
            _ => return Ok(None),
        };
        Ok(Some(invocation))
    }
}

/// Invocation tasks still running.
#[derive(Clone, Default)]
pub struct Invocations {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl Invocations {
    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn track<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        while let Some(finished) = tasks.try_join_next() {
            log_join(finished);
        }
        tasks.spawn(task);
    }

    /// Run one invocation on its own task and report the outcome to Slack.
    pub fn spawn_invocation(
        &self,
        responder: Arc<Responder>,
        function_execution_id: String,
        invocation: Invocation,
    ) {
        self.track(async move {
            let result = match &invocation {
                Invocation::Email(event) => responder.handle_email(event).await,
                Invocation::Thread(event) => responder.handle_thread_reply(event).await,
            };
            report_outcome(responder.slack().as_ref(), &function_execution_id, result).await;
        });
    }

    /// Wait for every tracked task. Returns how many were waited on.
    pub async fn drain(&self) -> usize {
        let mut tasks = std::mem::take(&mut *self.lock());
        let pending = tasks.len();
        while let Some(finished) = tasks.join_next().await {
            log_join(finished);
        }
        pending
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Invocation task failed");
    }
}

#[derive(Clone)]
struct AppState {
    responder: Arc<Responder>,
    manifest: Arc<Value>,
    invocations: Invocations,
}

/// Build the router: events endpoint, health check and manifest.
pub fn routes(responder: Arc<Responder>, manifest: Value, invocations: Invocations) -> Router {
    let state = AppState {
        responder,
        manifest: Arc::new(manifest),
        invocations,
    };

    Router::new()
        .route("/slack/events", post(slack_events))
        .route("/slack/manifest", get(app_manifest))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": APP_NAME,
    }))
}

async fn app_manifest(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manifest.as_ref().clone())
}

async fn slack_events(State(state): State<AppState>, Json(envelope): Json<EventEnvelope>) -> Response {
    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            info!("Answering Events API URL verification");
            Json(json!({ "challenge": challenge })).into_response()
        }
        EventEnvelope::EventCallback {
            event:
                CallbackEvent::FunctionExecuted {
                    function,
                    inputs,
                    function_execution_id,
                },
        } => {
            match Invocation::from_function(&function.callback_id, inputs) {
                Ok(Some(invocation)) => {
                    info!(
                        callback_id = %function.callback_id,
                        function_execution_id = %function_execution_id,
                        "Function executed"
                    );
                    state.invocations.spawn_invocation(
                        Arc::clone(&state.responder),
                        function_execution_id,
                        invocation,
                    );
                }
                Ok(None) => {
                    warn!(callback_id = %function.callback_id, "Ignoring unknown function");
                }
                Err(e) => {
                    warn!(callback_id = %function.callback_id, error = %e, "Rejecting function inputs");
                    let responder = Arc::clone(&state.responder);
                    state.invocations.track(async move {
                        report_outcome(responder.slack().as_ref(), &function_execution_id, Err(e)).await;
                    });
                }
            }
            StatusCode::OK.into_response()
        }
        EventEnvelope::EventCallback {
            event: CallbackEvent::Other,
        }
        | EventEnvelope::Unsupported => {
            debug!("Ignoring unsupported event");
            StatusCode::OK.into_response()
        }
    }
}

async fn report_outcome(
    slack: &dyn SlackApi,
    function_execution_id: &str,
    result: Result<InvocationReport, PipelineError>,
) {
    let completion = match result {
        Ok(_) => slack.complete_function_success(function_execution_id, json!({})).await,
        Err(e) => {
            error!(function_execution_id, error = %e, "Invocation aborted");
            slack
                .complete_function_error(function_execution_id, &e.to_string())
                .await
        }
    };
    if let Err(e) = completion {
        error!(function_execution_id, method = e.method(), error = %e, "Failed to report function outcome");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{OutboundPolicy, ResponderConfig};
    use crate::manifest::app_manifest as build_manifest;
    use crate::pipeline::test_support::{Call, CallLog, RecordingSlack, StubLlm, email_message};

    fn app(slack: RecordingSlack, llm: StubLlm) -> (Router, Arc<RecordingSlack>) {
        let slack = Arc::new(slack);
        let responder = Arc::new(Responder::new(slack.clone(), Arc::new(llm), ResponderConfig::default()));
        let manifest = build_manifest(&OutboundPolicy::default());
        (routes(responder, manifest, Invocations::default()), slack)
    }

    fn default_app() -> (Router, Arc<RecordingSlack>) {
        let log = CallLog::default();
        let llm = StubLlm::replying(log.clone(), "Dear Sender, thanks.");
        let slack = RecordingSlack::new()
            .with_log(log)
            .with_history(vec![email_message("100.1", "Hi, please send the invoice.")]);
        app(slack, llm)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn wait_for_report(slack: &RecordingSlack) -> Vec<Call> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let calls = slack.calls();
                if calls
                    .iter()
                    .any(|c| matches!(c, Call::CompleteSuccess(_) | Call::CompleteError(..)))
                {
                    return calls;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("function outcome never reported")
    }

    fn function_executed(callback_id: &str, inputs: Value) -> Value {
        json!({
            "type": "event_callback",
            "team_id": "T1",
            "event": {
                "type": "function_executed",
                "function": {"id": "Fn1", "callback_id": callback_id, "title": "t"},
                "inputs": inputs,
                "function_execution_id": "Fx1",
                "event_ts": "1700000000.000100"
            }
        })
    }

    #[tokio::test]
    async fn url_verification_echoes_challenge() {
        let (app, _slack) = default_app();
        let response = app
            .oneshot(post_json(
                "/slack/events",
                json!({"type": "url_verification", "token": "t", "challenge": "abc123"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"challenge": "abc123"}));
    }

    #[tokio::test]
    async fn email_function_runs_pipeline_and_completes() {
        let (app, slack) = default_app();
        let response = app
            .oneshot(post_json(
                "/slack/events",
                function_executed(
                    EMAIL_FUNCTION_CALLBACK_ID,
                    json!({"message_ts": "100.1", "channel_id": "C1"}),
                ),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let calls = wait_for_report(&slack).await;
        assert!(calls.iter().any(|c| matches!(c, Call::CreateTrigger(_))));
        assert_eq!(calls.last(), Some(&Call::CompleteSuccess("Fx1".to_string())));
    }

    #[tokio::test]
    async fn aborted_invocation_reports_error() {
        let log = CallLog::default();
        let llm = StubLlm::failing(log.clone());
        let slack = RecordingSlack::new()
            .with_log(log)
            .with_history(vec![email_message("100.1", "Hi")]);
        let (app, slack) = app(slack, llm);

        app.oneshot(post_json(
            "/slack/events",
            function_executed(
                EMAIL_FUNCTION_CALLBACK_ID,
                json!({"message_ts": "100.1", "channel_id": "C1"}),
            ),
        ))
        .await
        .unwrap();

        let calls = wait_for_report(&slack).await;
        assert!(matches!(
            calls.last(),
            Some(Call::CompleteError(id, msg)) if id == "Fx1" && msg.contains("stub")
        ));
    }

    #[tokio::test]
    async fn invalid_inputs_report_error_without_running() {
        let (app, slack) = default_app();
        app.oneshot(post_json(
            "/slack/events",
            function_executed(THREAD_FUNCTION_CALLBACK_ID, json!({"thread_ts": "100.1"})),
        ))
        .await
        .unwrap();

        let calls = wait_for_report(&slack).await;
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], Call::CompleteError(_, msg) if msg.contains("listener_function")));
    }

    #[tokio::test]
    async fn unknown_function_and_events_are_acknowledged() {
        let (app, slack) = default_app();
        let response = app
            .clone()
            .oneshot(post_json("/slack/events", function_executed("other_function", json!({}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(post_json(
                "/slack/events",
                json!({"type": "event_callback", "event": {"type": "reaction_added"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(slack.calls().is_empty());
    }

    #[tokio::test]
    async fn health_and_manifest_routes() {
        let (app, _slack) = default_app();
        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["status"], "ok");

        let response = app
            .oneshot(Request::get("/slack/manifest").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["display_information"]["name"], APP_NAME);
    }

    #[tokio::test]
    async fn drain_waits_for_outcome_report() {
        let log = CallLog::default();
        let llm = StubLlm::replying(log.clone(), "Dear Sender, thanks.");
        let slack = Arc::new(
            RecordingSlack::new()
                .with_log(log)
                .with_history(vec![email_message("100.1", "Hi, please send the invoice.")]),
        );
        let responder = Arc::new(Responder::new(slack.clone(), Arc::new(llm), ResponderConfig::default()));
        let invocations = Invocations::default();
        let app = routes(responder, build_manifest(&OutboundPolicy::default()), invocations.clone());

        app.oneshot(post_json(
            "/slack/events",
            function_executed(
                EMAIL_FUNCTION_CALLBACK_ID,
                json!({"message_ts": "100.1", "channel_id": "C1"}),
            ),
        ))
        .await
        .unwrap();

        assert_eq!(invocations.drain().await, 1);
        assert_eq!(slack.calls().last(), Some(&Call::CompleteSuccess("Fx1".to_string())));
        assert_eq!(invocations.drain().await, 0);
    }

    #[tokio::test]
    async fn rejected_inputs_report_is_tracked() {
        let slack = Arc::new(RecordingSlack::new());
        let responder = Arc::new(Responder::new(
            slack.clone(),
            Arc::new(StubLlm::replying(CallLog::default(), "unused")),
            ResponderConfig::default(),
        ));
        let invocations = Invocations::default();
        let app = routes(responder, build_manifest(&OutboundPolicy::default()), invocations.clone());

        app.oneshot(post_json(
            "/slack/events",
            function_executed(THREAD_FUNCTION_CALLBACK_ID, json!({"thread_ts": "100.1"})),
        ))
        .await
        .unwrap();

        assert_eq!(invocations.drain().await, 1);
        assert!(matches!(slack.calls().as_slice(), [Call::CompleteError(id, _)] if id == "Fx1"));
    }

    #[test]
    fn invocation_from_function_maps_callback_ids() {
        let email = Invocation::from_function(
            EMAIL_FUNCTION_CALLBACK_ID,
            json!({"message_ts": "100.1", "channel_id": "C1"}),
        )
        .unwrap();
        assert!(matches!(email, Some(Invocation::Email(_))));

        let thread = Invocation::from_function(
            THREAD_FUNCTION_CALLBACK_ID,
            json!({"thread_ts": "100.1", "channel_id": "C1", "bot_id": "U_BOT"}),
        )
        .unwrap();
        assert!(matches!(thread, Some(Invocation::Thread(ref t)) if t.bot_id == "U_BOT"));

        assert!(Invocation::from_function("x", json!({})).unwrap().is_none());
    }
}
