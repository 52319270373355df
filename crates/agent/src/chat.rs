//! Chat orchestration: one user message in, one engine reply out.
//!
//! For each request the orchestrator validates the input, registers a new
//! session when asked to, trims the content to the token budget, calls the
//! engine and finally records the exchange.

use std::sync::Arc;

use banter_core::engine::{ChatEngine, EngineRequest, EngineResponse};
use banter_core::error::{Error, Result};
use banter_core::session::{self, HistoryEntry};
use banter_core::store::SessionStore;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::context::ContentTrimmer;

/// An incoming chat message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default, deserialize_with = "session::text_or_empty")]
    pub context: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chat_history: Vec<HistoryEntry>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_new_session: bool,
}

/// The engine's reply tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(flatten)]
    pub engine: EngineResponse,
}

/// Runs a chat exchange against an engine and records it in a store.
pub struct ChatOrchestrator {
    engine: Arc<dyn ChatEngine>,
    store: Arc<dyn SessionStore>,
    trimmer: ContentTrimmer,
}

impl ChatOrchestrator {
    pub fn new(
        engine: Arc<dyn ChatEngine>,
        store: Arc<dyn SessionStore>,
        token_limit: usize,
    ) -> Self {
        Self {
            engine,
            store,
            trimmer: ContentTrimmer::new(token_limit),
        }
    }

    pub fn engine(&self) -> &Arc<dyn ChatEngine> {
        &self.engine
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn token_limit(&self) -> usize {
        self.trimmer.max_tokens()
    }

    /// Handle one chat message.
    ///
    /// A new session is created before the engine is called and is kept
    /// even when the call fails. The exchange is stored only on success,
    /// with the untrimmed input and the time the request arrived.
    pub async fn handle_chat(&self, request: ChatRequest) -> Result<ChatReply> {
        let input = request
            .input
            .filter(|input| !input.is_empty())
            .ok_or_else(|| Error::validation("Input is required for a new chat"))?;
        let session_id = request
            .session_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::validation("Session Id is required for a new chat"))?;

        let timestamp = session::format_timestamp(chrono::Utc::now());

        if request.is_new_session {
            self.store
                .create_session(&session_id, &session::session_title(&input), &request.context)
                .await?;
            info!(session_id = %session_id, "Created session");
        }

        let history = session::clean_history(request.chat_history);
        let trimmed = self.trimmer.trim(&input, &request.context, history);
        if trimmed.was_trimmed() {
            debug!(
                session_id = %session_id,
                history_dropped = trimmed.history_dropped,
                context_tokens_dropped = trimmed.context_tokens_dropped,
                "Request trimmed to fit token limit"
            );
        }

        let reply = self
            .engine
            .chat(EngineRequest {
                input: trimmed.input,
                context: trimmed.context,
                history: trimmed.chat_history,
            })
            .await
            .inspect_err(|e| {
                warn!(
                    session_id = %session_id,
                    engine = self.engine.name(),
                    status = e.status_code(),
                    error = %e,
                    "Engine call failed"
                );
            })?;

        let message_id = self
            .store
            .append_message(&session_id, &timestamp, &input, &reply.response)
            .await?;
        debug!(session_id = %session_id, message_id, "Stored chat message");

        Ok(ChatReply {
            session_id,
            engine: reply,
        })
    }
}

/// Deserialize `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
