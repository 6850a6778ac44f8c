//! Response pipelines.
//!
//! Every invocation is one sequential chain of remote calls:
//! 1. `ack::post_placeholder()`: "thinking" message in the thread
//! 2. `fetch`: the email message, or every reply in the thread
//! 3. `prompt`: build the model prompt
//! 4. `CompletionProvider::complete()`: generate the reply
//! 5. `ack::update_placeholder()`: swap the placeholder for the reply
//! 6. `registrar`: email pipeline only, subscribe to further replies
//!
//! Slack failures are logged and the chain moves on. A failed completion or a
//! missing email body aborts the invocation, leaving the placeholder as is.
//! Nothing is shared between invocations.

pub mod ack;
pub mod email;
pub mod fetch;
pub mod registrar;
pub mod thread;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use types::{EmailEvent, InvocationReport, ThreadEvent};

use std::sync::Arc;

use crate::config::ResponderConfig;
use crate::llm::CompletionProvider;
use crate::slack::SlackApi;

/// Runs the email and thread pipelines against injected clients.
pub struct Responder {
    slack: Arc<dyn SlackApi>,
    llm: Arc<dyn CompletionProvider>,
    config: ResponderConfig,
}

impl Responder {
    pub fn new(slack: Arc<dyn SlackApi>, llm: Arc<dyn CompletionProvider>, config: ResponderConfig) -> Self {
        Self { slack, llm, config }
    }

    pub fn slack(&self) -> &Arc<dyn SlackApi> {
        &self.slack
    }
}
