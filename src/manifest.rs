//! Slack app manifest.
//!
//! Declares the two custom functions this service executes, the workflows
//! that wrap them, the bot scopes the calls need and the outgoing domains.

use serde_json::{Value, json};

use crate::config::OutboundPolicy;

pub const APP_NAME: &str = "email-response-generator";

/// Function run when an email lands in the watched channel.
pub const EMAIL_FUNCTION_CALLBACK_ID: &str = "email_listener_function";

/// Function run for each new reply in a tracked thread.
pub const THREAD_FUNCTION_CALLBACK_ID: &str = "listener_function";

pub const EMAIL_WORKFLOW_CALLBACK_ID: &str = "email_workflow";
pub const THREAD_WORKFLOW_CALLBACK_ID: &str = "thread_workflow";

pub const BOT_SCOPES: &[&str] = &[
    "commands",
    "chat:write",
    "chat:write.public",
    "channels:history",
    "triggers:write",
    "reactions:read",
];

fn string_param(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

/// Render the manifest. Outgoing domains mirror the outbound allow-list.
pub fn app_manifest(policy: &OutboundPolicy) -> Value {
    json!({
        "_metadata": { "major_version": 2 },
        "display_information": {
            "name": APP_NAME,
            "description": "An app that creates responses to emails automatically within a thread.",
        },
        "features": {
            "bot_user": { "display_name": APP_NAME }
        },
        "oauth_config": {
            "scopes": { "bot": BOT_SCOPES }
        },
        "settings": {
            "event_subscriptions": { "bot_events": ["function_executed"] },
            "function_runtime": "remote",
        },
        "outgoing_domains": policy.domains(),
        "functions": {
            EMAIL_FUNCTION_CALLBACK_ID: {
                "title": "Email Listener Function",
                "description": "Listens for email on a channel and uses AI to generate a response",
                "input_parameters": {
                    "message_ts": string_param("The timestamp of the email message."),
                    "channel_id": string_param("The channel that the email was posted."),
                },
                "required_inputs": ["message_ts", "channel_id"],
                "output_parameters": {},
            },
            THREAD_FUNCTION_CALLBACK_ID: {
                "title": "Thread listener using AI",
                "description": "Listens on a thread, pulls in the contents and uses AI to respond.",
                "input_parameters": {
                    "bot_id": string_param("User ID of the bot"),
                    "thread_ts": string_param("The thread timestamp"),
                    "channel_id": string_param("The channel Id"),
                },
                "required_inputs": ["thread_ts", "channel_id", "bot_id"],
                "output_parameters": {},
            },
        },
        "workflows": {
            EMAIL_WORKFLOW_CALLBACK_ID: {
                "title": "Email workflow",
                "description": "Replies to an email posted in the channel",
                "input_parameters": {
                    "message_ts": string_param("The timestamp of the email message."),
                    "channel_id": string_param("The channel that the email was posted."),
                },
                "steps": [{
                    "function_id": format!("#/functions/{EMAIL_FUNCTION_CALLBACK_ID}"),
                    "inputs": {
                        "message_ts": "{{inputs.message_ts}}",
                        "channel_id": "{{inputs.channel_id}}",
                    },
                }],
            },
            THREAD_WORKFLOW_CALLBACK_ID: {
                "title": "Thread workflow",
                "description": "Replies to new messages in an email thread",
                "input_parameters": {
                    "thread_ts": string_param("The thread timestamp"),
                    "channel_id": string_param("The channel Id"),
                    "bot_id": string_param("User ID of the bot"),
                },
                "steps": [{
                    "function_id": format!("#/functions/{THREAD_FUNCTION_CALLBACK_ID}"),
                    "inputs": {
                        "thread_ts": "{{inputs.thread_ts}}",
                        "channel_id": "{{inputs.channel_id}}",
                        "bot_id": "{{inputs.bot_id}}",
                    },
                }],
            },
        },
    })
}
