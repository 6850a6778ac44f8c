//! Configuration types.
//!
//! Everything comes from environment variables. `from_env()` reads the real
//! process environment; `from_lookup()` takes any key lookup so the parsing
//! rules can be tested without touching global state.

use reqwest::Url;
use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::prompt::RoleAttribution;

/// Default Slack Web API base URL.
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

/// Default placeholder posted while the model is working.
pub const DEFAULT_PLACEHOLDER_TEXT: &str =
    "Just a moment while I think of a response :hourglass_flowing_sand:";

/// Domains the service may talk to unless `OUTGOING_DOMAINS` says otherwise.
pub const DEFAULT_OUTGOING_DOMAINS: &[&str] = &["slack.com", "api.anthropic.com", "api.openai.com"];

const DEFAULT_PORT: u16 = 3000;

/// Slack connection settings.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub bot_token: SecretString,
    pub api_base: String,
}

/// Per-invocation behaviour of the response pipelines.
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Text of the "thinking" message posted before the model runs.
    pub placeholder_text: String,
    /// How thread messages are mapped to human/assistant turns.
    pub role_attribution: RoleAttribution,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            placeholder_text: DEFAULT_PLACEHOLDER_TEXT.to_string(),
            role_attribution: RoleAttribution::default(),
        }
    }
}

/// Outbound network allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPolicy {
    allowed_domains: Vec<String>,
}

impl OutboundPolicy {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_domains: domains
                .into_iter()
                .map(|d| d.into().trim().trim_start_matches('.').to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn domains(&self) -> &[String] {
        &self.allowed_domains
    }

    /// A host is allowed if it equals an allowed domain or is a subdomain of one.
    pub fn is_host_allowed(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.allowed_domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    }

    /// Parse `base_url` and reject it unless its host is on the allow-list.
    pub fn check_url(&self, base_url: &str) -> Result<Url, ConfigError> {
        let url = Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            key: "base_url".to_string(),
            message: format!("{base_url}: {e}"),
        })?;
        let host = url.host_str().unwrap_or_default().to_string();
        if !self.is_host_allowed(&host) {
            return Err(ConfigError::DomainNotAllowed {
                host,
                allowed: self.allowed_domains.join(", "),
            });
        }
        Ok(url)
    }
}

impl Default for OutboundPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_OUTGOING_DOMAINS.iter().copied())
    }
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub llm: LlmConfig,
    pub responder: ResponderConfig,
    pub outbound: OutboundPolicy,
    pub port: u16,
}

impl AppConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let slack = SlackConfig {
            bot_token: SecretString::from(require("SLACK_BOT_TOKEN")?),
            api_base: get("SLACK_API_BASE").unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string()),
        };

        let backend = match get("LLM_BACKEND") {
            Some(raw) => raw.parse::<LlmBackend>()?,
            None => LlmBackend::Anthropic,
        };
        let api_key = require(backend.api_key_var())?;
        let max_tokens = match get("LLM_MAX_TOKENS") {
            Some(raw) => parse_positive("LLM_MAX_TOKENS", &raw)?,
            None => crate::llm::DEFAULT_MAX_TOKENS,
        };
        let llm = LlmConfig {
            backend,
            api_key: SecretString::from(api_key),
            model: get("LLM_MODEL").unwrap_or_else(|| backend.default_model().to_string()),
            max_tokens,
            api_base: get("LLM_API_BASE").unwrap_or_else(|| backend.default_api_base().to_string()),
        };

        let role_attribution = match get("RESPONDER_ROLE_ATTRIBUTION") {
            Some(raw) => raw.parse::<RoleAttribution>()?,
            None => RoleAttribution::default(),
        };
        let responder = ResponderConfig {
            placeholder_text: get("RESPONDER_PLACEHOLDER_TEXT")
                .unwrap_or_else(|| DEFAULT_PLACEHOLDER_TEXT.to_string()),
            role_attribution,
        };

        let outbound = match get("OUTGOING_DOMAINS") {
            Some(raw) => OutboundPolicy::new(raw.split(',')),
            None => OutboundPolicy::default(),
        };

        let port = match get("RESPONDER_PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "RESPONDER_PORT".to_string(),
                message: format!("{raw}: {e}"),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            slack,
            llm,
            responder,
            outbound,
            port,
        })
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u32, ConfigError> {
    match raw.parse::<u32>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw}: {e}"),
        }),
    }
}
