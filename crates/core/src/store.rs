//! SessionStore trait: persistence of sessions and their chat messages.
//!
//! Two record kinds live behind this trait: session metadata (title and
//! context) and the chat messages of each session. Every message belongs to
//! an existing session; deleting a session removes its messages with it.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::session::{ChatMessage, Session, SessionSummary};

/// The core store trait. Implementations: SQLite.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// One summary per session that has at least one message, built from
    /// that session's latest message, newest first.
    async fn list_latest_per_session(&self) -> Result<Vec<SessionSummary>, StoreError>;

    /// All messages of a session, oldest first. Unknown sessions yield an
    /// empty list.
    async fn get_history(&self, session_id: &str) -> Result<Vec<ChatMessage>, StoreError>;

    /// Fetch a session's metadata.
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StoreError>;

    /// Insert session metadata. An existing row with the same id is left
    /// untouched.
    async fn create_session(
        &self,
        session_id: &str,
        title: &str,
        context: &str,
    ) -> Result<(), StoreError>;

    /// Persist one exchange and return its id.
    async fn append_message(
        &self,
        session_id: &str,
        timestamp: &str,
        input: &str,
        response: &str,
    ) -> Result<i64, StoreError>;

    /// Replace a session's context. Returns the number of rows changed
    /// (0 when the session does not exist).
    async fn update_context(&self, session_id: &str, context: &str) -> Result<u64, StoreError>;

    /// Replace a session's title. Returns the number of rows changed.
    async fn rename_session(&self, session_id: &str, title: &str) -> Result<u64, StoreError>;

    /// Delete a session and all of its messages atomically. Deleting an
    /// unknown session succeeds. Returns the number of messages removed.
    async fn delete_session(&self, session_id: &str) -> Result<u64, StoreError>;
}
