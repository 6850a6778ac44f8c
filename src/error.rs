//! Error types for the email response generator.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Outbound domain not allowed: {host} (allowed: {allowed})")]
    DomainNotAllowed { host: String, allowed: String },

    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),
}

/// Slack Web API errors.
///
/// `Api` is the `{"ok": false, "error": "..."}` shape every Web API method
/// can return; the others are transport or decoding failures.
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("slack {method} failed: {error}")]
    Api { method: String, error: String },

    #[error("slack {method} HTTP error: {reason}")]
    Http { method: String, reason: String },

    #[error("slack {method} returned an invalid response: {reason}")]
    InvalidResponse { method: String, reason: String },
}

impl SlackError {
    /// The Web API method the failed call targeted.
    pub fn method(&self) -> &str {
        match self {
            Self::Api { method, .. }
            | Self::Http { method, .. }
            | Self::InvalidResponse { method, .. } => method,
        }
    }
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Errors that abort a single pipeline invocation.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Missing expected data: {0}")]
    MissingData(String),

    #[error("Invalid event inputs: {0}")]
    InvalidInputs(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}
