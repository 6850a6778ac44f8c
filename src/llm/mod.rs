//! LLM integration.
//!
//! Supports:
//! - **Anthropic**: legacy text completions, transcript-encoded prompts, over reqwest
//! - **OpenAI**: chat completions via rig-core, with a system preamble
//!
//! Both sit behind the [`CompletionProvider`] trait.

pub mod anthropic;
pub mod openai;
pub mod provider;

pub use anthropic::AnthropicCompletions;
pub use openai::OpenAiChat;
pub use provider::{Completion, CompletionProvider};

use std::str::FromStr;
use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::config::OutboundPolicy;
use crate::error::ConfigError;

/// Default maximum output tokens per completion.
pub const DEFAULT_MAX_TOKENS: u32 = 300;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl LlmBackend {
    /// Environment variable holding this backend's API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "claude-2",
            Self::OpenAi => "gpt-4o-mini",
        }
    }

    pub fn default_api_base(self) -> &'static str {
        match self {
            Self::Anthropic => "https://api.anthropic.com",
            Self::OpenAi => "https://api.openai.com",
        }
    }
}

impl FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" | "open-ai" => Ok(Self::OpenAi),
            other => Err(ConfigError::InvalidValue {
                key: "LLM_BACKEND".to_string(),
                message: format!("unknown backend '{other}' (expected anthropic or openai)"),
            }),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub max_tokens: u32,
    pub api_base: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(
    config: &LlmConfig,
    policy: &OutboundPolicy,
) -> Result<Arc<dyn CompletionProvider>, ConfigError> {
    policy.check_url(&config.api_base)?;

    let provider: Arc<dyn CompletionProvider> = match config.backend {
        LlmBackend::Anthropic => {
            let http = reqwest::Client::builder()
                .user_agent(concat!("email-response-generator/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
            Arc::new(AnthropicCompletions::new(
                http,
                &config.api_base,
                config.api_key.clone(),
                &config.model,
                config.max_tokens,
            ))
        }
        LlmBackend::OpenAi => create_openai_provider(config)?,
    };

    tracing::info!(
        provider = provider.provider_name(),
        model = provider.model_name(),
        max_tokens = config.max_tokens,
        "LLM provider configured"
    );
    Ok(provider)
}

fn create_openai_provider(config: &LlmConfig) -> Result<Arc<dyn CompletionProvider>, ConfigError> {
    use rig::providers::openai;

    let base_url = format!("{}/v1", config.api_base.trim_end_matches('/'));
    let client: rig::client::Client<openai::client::OpenAIResponsesExt> = openai::Client::builder()
        .api_key(config.api_key.expose_secret())
        .base_url(&base_url)
        .build()
        .map_err(|e| ConfigError::HttpClient(format!("Failed to create OpenAI client: {e}")))?;

    let model = client.completion_model(&config.model).completions_api();
    Ok(Arc::new(OpenAiChat::new(model, &config.model, config.max_tokens)))
}
