//! ChatEngine trait: the abstraction over the hosted NLP chatbot.
//!
//! An engine takes the user's input, the session context and prior
//! input/response pairs, and returns the bot's reply. The reply may carry
//! provider-specific fields next to `response`; they are kept so the HTTP
//! layer can hand them back to the client untouched.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::session::ChatTurn;

/// A single chatbot request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineRequest {
    pub input: String,
    pub context: String,
    pub history: Vec<ChatTurn>,
}

/// The engine's reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineResponse {
    /// The bot's answer to `input`.
    pub response: String,

    /// Everything else the engine returned (e.g. its echo of `history`).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EngineResponse {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// The core engine trait.
///
/// The orchestrator calls `chat()` without knowing which hosted service
/// answers it. Implementations must not retry: a failed call is reported
/// once to the caller.
#[async_trait]
pub trait ChatEngine: Send + Sync {
    /// A human-readable name for this engine (e.g., "nlpcloud").
    fn name(&self) -> &str;

    /// The model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Send one chatbot request and wait for the reply.
    async fn chat(&self, request: EngineRequest) -> std::result::Result<EngineResponse, EngineError>;
}
