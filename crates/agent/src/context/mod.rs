//! Token budgeting for engine requests.
//!
//! Every request sends three things to the engine: the user's input, the
//! session context and the chat history. When their combined token count
//! exceeds the budget, content is dropped in fixed priority order:
//!
//! | Part | Trim Strategy |
//! |------|---------------|
//! | 1. Input | Never trimmed |
//! | 2. Chat history | Oldest turns dropped |
//! | 3. Context | Oldest (leftmost) tokens dropped |

pub mod token;
pub mod trimmer;

pub use trimmer::{ContentTrimmer, TrimmedContent};
