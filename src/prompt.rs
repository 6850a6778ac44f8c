//! Prompt construction.
//!
//! A [`Prompt`] is an ordered list of role-tagged turns. Text-completion
//! backends encode it as a single `Human:`/`Assistant:` transcript; chat
//! backends map each turn to a message after a system instruction.

use std::str::FromStr;

use crate::error::ConfigError;
use crate::slack::SlackMessage;

/// Marker that opens a human turn in the text-completion encoding.
pub const HUMAN_MARKER: &str = "\n\nHuman:";

/// Marker that opens an assistant turn in the text-completion encoding.
pub const ASSISTANT_MARKER: &str = "\n\nAssistant:";

/// Instruction that leads every chat-encoded prompt, and opens a transcript
/// whose first turn is not a human one.
pub const SYSTEM_INSTRUCTION: &str = "You write replies to emails that were forwarded into a Slack thread. \
Answer the latest message in the conversation as the email's recipient. \
Reply with the response text only.";

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Human,
    Assistant,
}

/// How thread messages are attributed to roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoleAttribution {
    /// Messages whose author is the bot are assistant turns, the rest human.
    ByAuthor,
    /// Every message is a human turn, regardless of author.
    #[default]
    AllHuman,
}

impl FromStr for RoleAttribution {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "by-author" | "by_author" | "author" => Ok(Self::ByAuthor),
            "all-human" | "all_human" | "human" => Ok(Self::AllHuman),
            other => Err(ConfigError::InvalidValue {
                key: "RESPONDER_ROLE_ATTRIBUTION".to_string(),
                message: format!("unknown role attribution '{other}' (expected by-author or all-human)"),
            }),
        }
    }
}

/// One turn of a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// An ordered sequence of turns, built fresh for every invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    turns: Vec<Turn>,
}

impl Prompt {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Encode as a single transcript string ending with an open assistant turn.
    ///
    /// Text-completion endpoints only accept transcripts that open with a
    /// human turn. When the first turn belongs to the assistant (a bot reply
    /// heading a thread) or there are no turns, [`SYSTEM_INSTRUCTION`] is
    /// sent as that opening human turn.
    pub fn to_transcript(&self) -> String {
        let mut out = String::new();
        if self.turns.first().is_none_or(|t| t.role != Role::Human) {
            push_turn(&mut out, HUMAN_MARKER, SYSTEM_INSTRUCTION);
        }
        for turn in &self.turns {
            let marker = match turn.role {
                Role::Human => HUMAN_MARKER,
                Role::Assistant => ASSISTANT_MARKER,
            };
            push_turn(&mut out, marker, &turn.text);
        }
        out.push_str(ASSISTANT_MARKER);
        out
    }
}

fn push_turn(out: &mut String, marker: &str, text: &str) {
    out.push_str(marker);
    out.push(' ');
    out.push_str(text);
}

/// Instruction used for the first reply to an email. The email text is
/// embedded verbatim.
pub fn email_instruction(email_text: &str) -> String {
    format!(
        "Please write a response to the following email in 100 words with greetings \
         <email>{email_text}</email>. \
         Do not add tags, comment on your response or mention the number of words."
    )
}

/// Prompt for the initial email: a single human turn.
pub fn build_email_prompt(email_text: &str) -> Prompt {
    Prompt::new(vec![Turn::human(email_instruction(email_text))])
}

/// Prompt for a thread reply.
///
/// The first message is the root carrying the email file and never becomes a
/// turn, so `N` messages always produce `N - 1` turns.
pub fn build_thread_prompt(
    messages: &[SlackMessage],
    bot_id: &str,
    attribution: RoleAttribution,
) -> Prompt {
    let turns = messages
        .iter()
        .skip(1)
        .map(|msg| {
            let text = msg.text.as_str();
            match attribution {
                RoleAttribution::ByAuthor if msg.author() == Some(bot_id) => Turn::assistant(text),
                _ => Turn::human(text),
            }
        })
        .collect();
    Prompt::new(turns)
}
