//! Chat orchestration for Banter.
//!
//! Each chat message goes through the same steps:
//!
//! 1. **Validate** the input and session id
//! 2. **Register** the session on its first message
//! 3. **Trim** input, context and history to the token limit
//! 4. **Call** the chat engine
//! 5. **Record** the exchange in the session store
//!
//! A failed engine call stops the request at step 4; nothing is recorded.

pub mod chat;
pub mod context;

pub use chat::{ChatOrchestrator, ChatReply, ChatRequest};
pub use context::{ContentTrimmer, TrimmedContent};
