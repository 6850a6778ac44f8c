//! Event trigger definitions for `workflows.triggers.create`.
//!
//! Filters are a small predicate tree that Slack evaluates against each
//! incoming event. This crate only builds and serializes them.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::manifest::THREAD_WORKFLOW_CALLBACK_ID;

/// Event type Slack fires for every new message in a channel.
pub const MESSAGE_POSTED_EVENT: &str = "slack#/events/message_posted";

/// Filter syntax version accepted by the trigger API.
const FILTER_VERSION: u32 = 1;

/// Fields of a `message_posted` event a filter can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventField {
    ThreadTs,
    UserId,
    ChannelId,
}

impl EventField {
    fn name(self) -> &'static str {
        match self {
            Self::ThreadTs => "thread_ts",
            Self::UserId => "user_id",
            Self::ChannelId => "channel_id",
        }
    }

    /// Template reference, e.g. `{{data.thread_ts}}`.
    pub fn reference(self) -> String {
        format!("{{{{data.{}}}}}", self.name())
    }
}

/// A boolean condition over event fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Equals { field: EventField, value: String },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn equals(field: EventField, value: impl Into<String>) -> Self {
        Self::Equals {
            field,
            value: value.into(),
        }
    }

    pub fn and(inputs: Vec<Predicate>) -> Self {
        Self::And(inputs)
    }

    pub fn or(inputs: Vec<Predicate>) -> Self {
        Self::Or(inputs)
    }

    pub fn negate(inner: Predicate) -> Self {
        Self::Not(Box::new(inner))
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Equals { field, value } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("statement", &format!("{} == {}", field.reference(), value))?;
                map.end()
            }
            Self::And(inputs) | Self::Or(inputs) => {
                let operator = if matches!(self, Self::And(_)) { "AND" } else { "OR" };
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("operator", operator)?;
                map.serialize_entry("inputs", inputs)?;
                map.end()
            }
            Self::Not(inner) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("operator", "NOT")?;
                map.serialize_entry("inputs", std::slice::from_ref(inner.as_ref()))?;
                map.end()
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals { field, value } => write!(f, "{} == {}", field.name(), value),
            Self::And(inputs) | Self::Or(inputs) => {
                let sep = if matches!(self, Self::And(_)) { " AND " } else { " OR " };
                f.write_str("(")?;
                for (i, input) in inputs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{input}")?;
                }
                f.write_str(")")
            }
            Self::Not(inner) => write!(f, "NOT {inner}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerFilter {
    pub version: u32,
    pub root: Predicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerEvent {
    pub event_type: String,
    pub channel_ids: Vec<String>,
    pub filter: TriggerFilter,
}

/// A workflow input, either a literal or a `{{data.*}}` template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerInput {
    pub value: String,
}

/// Request body for `workflows.triggers.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerDefinition {
    #[serde(rename = "type")]
    pub trigger_type: String,
    pub name: String,
    pub description: String,
    pub workflow: String,
    pub event: TriggerEvent,
    pub inputs: BTreeMap<String, TriggerInput>,
}

/// Trigger that routes every new reply in `thread_ts` (not written by
/// `bot_id`) to the thread workflow.
pub fn thread_listener_trigger(channel_id: &str, thread_ts: &str, bot_id: &str) -> TriggerDefinition {
    let root = Predicate::and(vec![
        Predicate::equals(EventField::ThreadTs, thread_ts),
        Predicate::negate(Predicate::equals(EventField::UserId, bot_id)),
    ]);

    let inputs = BTreeMap::from([
        (
            "thread_ts".to_string(),
            TriggerInput {
                value: thread_ts.to_string(),
            },
        ),
        (
            "channel_id".to_string(),
            TriggerInput {
                value: EventField::ChannelId.reference(),
            },
        ),
        (
            "bot_id".to_string(),
            TriggerInput {
                value: bot_id.to_string(),
            },
        ),
    ]);

    TriggerDefinition {
        trigger_type: "event".to_string(),
        name: format!("Thread Listener response for ts: {thread_ts}"),
        description: "Listens on the thread for the message in the name".to_string(),
        workflow: format!("#/workflows/{THREAD_WORKFLOW_CALLBACK_ID}"),
        event: TriggerEvent {
            event_type: MESSAGE_POSTED_EVENT.to_string(),
            channel_ids: vec![channel_id.to_string()],
            filter: TriggerFilter {
                version: FILTER_VERSION,
                root,
            },
        },
        inputs,
    }
}
