//! SQLite session store.
//!
//! Uses a single SQLite database file with two tables:
//! - `session_metadata`: one row per session (title, context)
//! - `chats`: one row per input/response exchange
//!
//! Foreign keys are enforced, so a chat row can only reference an existing
//! session.

use async_trait::async_trait;
use banter_core::error::StoreError;
use banter_core::session::{ChatMessage, Session, SessionSummary};
use banter_core::store::SessionStore;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// Latest message per session. Equal timestamps resolve to the higher id so
/// every session yields exactly one row.
const LATEST_PER_SESSION_SQL: &str = r#"
    SELECT s.session_id, s.title, s.context, c.timestamp, c.input, c.id
    FROM chats c
    JOIN session_metadata s ON s.session_id = c.session_id
    WHERE c.id = (
        SELECT c2.id FROM chats c2
        WHERE c2.session_id = c.session_id
        ORDER BY c2.timestamp DESC, c2.id DESC
        LIMIT 1
    )
    ORDER BY c.timestamp DESC, c.id DESC
"#;

/// A SQLite-backed [`SessionStore`].
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Open (or create) the database at `path`.
    ///
    /// The file and all tables/indexes are created automatically.
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = if is_memory_path(path) {
            // Every connection to `:memory:` is a separate database, so the
            // pool must hold exactly one and never recycle it.
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
                .pragma("foreign_keys", "ON");
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .pragma("foreign_keys", "ON");
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .connect_with(options)
                .await
        }
        .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite session store initialized at {path}");
        Ok(store)
    }

    /// Ephemeral in-memory store.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::new("sqlite::memory:", 1).await
    }

    /// Run schema migrations: creates both tables and the history index.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_metadata (
                session_id TEXT PRIMARY KEY,
                title      TEXT NOT NULL DEFAULT '',
                context    TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("session_metadata table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chats (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL REFERENCES session_metadata(session_id),
                timestamp  TEXT NOT NULL,
                input      TEXT NOT NULL,
                response   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("chats table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chats_session_timestamp ON chats(session_id, timestamp)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("chats index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Parse a `ChatMessage` from a `chats` row.
    fn row_to_message(row: &SqliteRow) -> Result<ChatMessage, StoreError> {
        Ok(ChatMessage {
            id: column(row, "id")?,
            session_id: column(row, "session_id")?,
            timestamp: column(row, "timestamp")?,
            input: column(row, "input")?,
            response: column(row, "response")?,
        })
    }

    /// Parse a `SessionSummary` from a latest-per-session row.
    fn row_to_summary(row: &SqliteRow) -> Result<SessionSummary, StoreError> {
        Ok(SessionSummary {
            session_id: column(row, "session_id")?,
            title: column(row, "title")?,
            context: column(row, "context")?,
            timestamp: column(row, "timestamp")?,
            input: column(row, "input")?,
            id: column(row, "id")?,
        })
    }
}

fn is_memory_path(path: &str) -> bool {
    matches!(path, ":memory:" | "sqlite::memory:" | "sqlite://:memory:")
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn list_latest_per_session(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let rows = sqlx::query(LATEST_PER_SESSION_SQL)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Latest per session: {e}")))?;

        rows.iter().map(Self::row_to_summary).collect()
    }

    async fn get_history(&self, session_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, session_id, timestamp, input, response FROM chats
             WHERE session_id = ?1
             ORDER BY timestamp ASC, id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Chat history: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query(
            "SELECT session_id, title, context FROM session_metadata WHERE session_id = ?1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("GET session: {e}")))?;

        row.map(|r| {
            Ok(Session {
                session_id: column(&r, "session_id")?,
                title: column(&r, "title")?,
                context: column(&r, "context")?,
            })
        })
        .transpose()
    }

    async fn create_session(
        &self,
        session_id: &str,
        title: &str,
        context: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO session_metadata (session_id, title, context) VALUES (?1, ?2, ?3)
             ON CONFLICT(session_id) DO NOTHING",
        )
        .bind(session_id)
        .bind(title)
        .bind(context)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT session failed: {e}")))?;

        if result.rows_affected() == 0 {
            debug!(session_id, "Session already exists, keeping stored metadata");
        } else {
            debug!(session_id, "Created session");
        }
        Ok(())
    }

    async fn append_message(
        &self,
        session_id: &str,
        timestamp: &str,
        input: &str,
        response: &str,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO chats (session_id, timestamp, input, response) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(session_id)
        .bind(timestamp)
        .bind(input)
        .bind(response)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT chat failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(session_id, id, "Stored chat message");
        Ok(id)
    }

    async fn update_context(&self, session_id: &str, context: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE session_metadata SET context = ?1 WHERE session_id = ?2")
            .bind(context)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("UPDATE context failed: {e}")))?;

        Ok(result.rows_affected())
    }

    async fn rename_session(&self, session_id: &str, title: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE session_metadata SET title = ?1 WHERE session_id = ?2")
            .bind(title)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("UPDATE title failed: {e}")))?;

        Ok(result.rows_affected())
    }

    async fn delete_session(&self, session_id: &str) -> Result<u64, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;

        // Rolled back when `tx` drops on an early return.
        let chats = sqlx::query("DELETE FROM chats WHERE session_id = ?1")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE chats failed: {e}")))?;

        sqlx::query("DELETE FROM session_metadata WHERE session_id = ?1")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE session failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("COMMIT failed: {e}")))?;

        let removed = chats.rows_affected();
        debug!(session_id, removed, "Deleted session");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteSessionStore {
        SqliteSessionStore::in_memory().await.unwrap()
    }

    async fn seeded_session(store: &SqliteSessionStore, id: &str) {
        store.create_session(id, "Title", "Context").await.unwrap();
    }

    #[tokio::test]
    async fn create_and_get_session() {
        let store = test_store().await;
        store
            .create_session("s1", "Planning a trip", "You are a travel agent")
            .await
            .unwrap();

        let session = store.get_session("s1").await.unwrap().unwrap();
        assert_eq!(session.title, "Planning a trip");
        assert_eq!(session.context, "You are a travel agent");
        assert!(store.get_session("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_session_twice_keeps_first_row() {
        let store = test_store().await;
        store.create_session("s1", "First", "ctx").await.unwrap();
        store.create_session("s1", "Second", "other").await.unwrap();

        let session = store.get_session("s1").await.unwrap().unwrap();
        assert_eq!(session.title, "First");
    }

    #[tokio::test]
    async fn history_is_ordered_oldest_first() {
        let store = test_store().await;
        seeded_session(&store, "s1").await;
        store
            .append_message("s1", "2024-01-01T00:00:02.000Z", "second", "b")
            .await
            .unwrap();
        store
            .append_message("s1", "2024-01-01T00:00:01.000Z", "first", "a")
            .await
            .unwrap();

        let history = store.get_history("s1").await.unwrap();
        let inputs: Vec<&str> = history.iter().map(|m| m.input.as_str()).collect();
        assert_eq!(inputs, vec!["first", "second"]);
        assert!(history.iter().all(|m| m.session_id == "s1"));
    }

    #[tokio::test]
    async fn history_of_unknown_session_is_empty() {
        let store = test_store().await;
        assert!(store.get_history("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn message_requires_existing_session() {
        let store = test_store().await;
        let result = store
            .append_message("ghost", "2024-01-01T00:00:00.000Z", "hi", "hello")
            .await;
        assert!(matches!(result, Err(StoreError::Storage(_))));
    }

    #[tokio::test]
    async fn latest_per_session_newest_first() {
        let store = test_store().await;
        seeded_session(&store, "old").await;
        seeded_session(&store, "new").await;
        seeded_session(&store, "empty").await;

        store
            .append_message("old", "2024-01-01T00:00:00.000Z", "old-1", "r")
            .await
            .unwrap();
        store
            .append_message("new", "2024-01-02T00:00:00.000Z", "new-1", "r")
            .await
            .unwrap();
        store
            .append_message("old", "2024-01-03T00:00:00.000Z", "old-2", "r")
            .await
            .unwrap();

        let summaries = store.list_latest_per_session().await.unwrap();
        assert_eq!(summaries.len(), 2, "sessions without messages are excluded");
        assert_eq!(summaries[0].session_id, "old");
        assert_eq!(summaries[0].input, "old-2");
        assert_eq!(summaries[0].timestamp, "2024-01-03T00:00:00.000Z");
        assert_eq!(summaries[0].title, "Title");
        assert_eq!(summaries[0].context, "Context");
        assert_eq!(summaries[1].session_id, "new");
    }

    #[tokio::test]
    async fn latest_per_session_breaks_timestamp_ties_by_id() {
        let store = test_store().await;
        seeded_session(&store, "s1").await;
        let ts = "2024-01-01T00:00:00.000Z";
        store.append_message("s1", ts, "a", "r").await.unwrap();
        let second = store.append_message("s1", ts, "b", "r").await.unwrap();

        let summaries = store.list_latest_per_session().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, second);
        assert_eq!(summaries[0].input, "b");
    }

    #[tokio::test]
    async fn update_context_reports_changes() {
        let store = test_store().await;
        seeded_session(&store, "s1").await;

        assert_eq!(store.update_context("s1", "Be brief").await.unwrap(), 1);
        assert_eq!(
            store.get_session("s1").await.unwrap().unwrap().context,
            "Be brief"
        );
        assert_eq!(store.update_context("unknown", "x").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rename_reports_changes() {
        let store = test_store().await;
        seeded_session(&store, "s1").await;

        assert_eq!(store.rename_session("s1", "Renamed").await.unwrap(), 1);
        assert_eq!(
            store.get_session("s1").await.unwrap().unwrap().title,
            "Renamed"
        );
        assert_eq!(store.rename_session("unknown", "x").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_removes_session_and_messages() {
        let store = test_store().await;
        seeded_session(&store, "s1").await;
        seeded_session(&store, "s2").await;
        store
            .append_message("s1", "2024-01-01T00:00:00.000Z", "a", "b")
            .await
            .unwrap();
        store
            .append_message("s1", "2024-01-01T00:00:01.000Z", "c", "d")
            .await
            .unwrap();
        store
            .append_message("s2", "2024-01-01T00:00:02.000Z", "e", "f")
            .await
            .unwrap();

        assert_eq!(store.delete_session("s1").await.unwrap(), 2);
        assert!(store.get_session("s1").await.unwrap().is_none());
        assert!(store.get_history("s1").await.unwrap().is_empty());
        assert_eq!(store.get_history("s2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_unknown_session_is_idempotent() {
        let store = test_store().await;
        seeded_session(&store, "s1").await;
        store
            .append_message("s1", "2024-01-01T00:00:00.000Z", "a", "b")
            .await
            .unwrap();

        assert_eq!(store.delete_session("nope").await.unwrap(), 0);
        assert_eq!(store.delete_session("nope").await.unwrap(), 0);
        assert_eq!(store.list_latest_per_session().await.unwrap().len(), 1);
        assert_eq!(store.get_history("s1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteSessionStore::new(path, 2).await.unwrap();
            seeded_session(&store, "s1").await;
            store
                .append_message("s1", "2024-01-01T00:00:00.000Z", "kept", "yes")
                .await
                .unwrap();
        }

        let reopened = SqliteSessionStore::new(path, 2).await.unwrap();
        let history = reopened.get_history("s1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].input, "kept");
    }

    #[tokio::test]
    async fn backend_name() {
        assert_eq!(test_store().await.name(), "sqlite");
    }
}
