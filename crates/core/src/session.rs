//! Session and chat records.
//!
//! A session is a conversation thread with a title and a mutable context
//! string. Every successful exchange with the chat engine is stored as one
//! [`ChatMessage`] holding both the user input and the bot response.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Number of characters of the first message used as a session title.
pub const TITLE_MAX_CHARS: usize = 100;

/// Session metadata row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub title: String,
    pub context: String,
}

/// A persisted exchange: one user input and the engine's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: String,
    /// ISO-8601 UTC, millisecond precision (`2024-05-01T12:00:00.000Z`).
    pub timestamp: String,
    pub input: String,
    pub response: String,
}

/// A session together with its most recent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub title: String,
    pub context: String,
    pub timestamp: String,
    pub input: String,
    /// Id of the latest message.
    pub id: i64,
}

/// An input/response pair as sent to the chat engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    #[serde(default, deserialize_with = "text_or_empty")]
    pub input: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub response: String,
}

impl ChatTurn {
    pub fn new(input: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            response: response.into(),
        }
    }
}

/// A chat history entry as a client sends it back.
///
/// Clients usually echo rows from `get-chat-history`, so entries may carry
/// the store's bookkeeping fields. Those are accepted and dropped by
/// [`HistoryEntry::into_turn`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
    #[serde(default)]
    pub session_id: Option<serde_json::Value>,
    #[serde(flatten)]
    pub turn: ChatTurn,
}

impl HistoryEntry {
    pub fn into_turn(self) -> ChatTurn {
        self.turn
    }
}

/// Strip bookkeeping fields from client-supplied history.
pub fn clean_history(entries: Vec<HistoryEntry>) -> Vec<ChatTurn> {
    entries.into_iter().map(HistoryEntry::into_turn).collect()
}

/// Generate a fresh session identifier. Nothing is persisted until the
/// first chat message of the session arrives.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Title for a new session: the first [`TITLE_MAX_CHARS`] characters of
/// its first message.
pub fn session_title(input: &str) -> String {
    input.chars().take(TITLE_MAX_CHARS).collect()
}

/// Render a timestamp the way chat rows store it.
///
/// Fixed width and always UTC, so lexical order matches chronological order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Deserialize a text field, treating `null` and non-string values as empty.
pub fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(text)) => text,
        _ => String::new(),
    })
}
