//! Email response generator: answers emails posted to Slack with an LLM.

pub mod config;
pub mod error;
pub mod llm;
pub mod manifest;
pub mod pipeline;
pub mod prompt;
pub mod server;
pub mod slack;
