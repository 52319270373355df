//! # Banter Core
//!
//! Domain types, traits, and error definitions for the Banter chat backend.
//! This crate has no framework dependencies: it defines the session model,
//! the chat engine contract and the session store contract that the other
//! crates implement against.
//!
//! - `engine`: the external NLP chatbot contract (`ChatEngine`)
//! - `store`: persistence of sessions and chat messages (`SessionStore`)
//! - `session`: the records both of them exchange

pub mod engine;
pub mod error;
pub mod session;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use engine::{ChatEngine, EngineRequest, EngineResponse};
pub use error::{EngineError, Error, Result, StoreError};
pub use session::{ChatMessage, ChatTurn, HistoryEntry, Session, SessionSummary, new_session_id};
pub use store::SessionStore;
