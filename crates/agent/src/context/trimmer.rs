//! Fit input, context and history into one token budget.

use super::token::{count_tokens, joined_tokens, tokenize, turn_chars};
use banter_core::session::ChatTurn;
use tracing::debug;

/// What was sent to the engine after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedContent {
    pub input: String,
    pub context: String,
    pub chat_history: Vec<ChatTurn>,
    pub max_tokens: usize,
    /// Token count of the untrimmed request.
    pub total_tokens: usize,
    /// Oldest history turns removed.
    pub history_dropped: usize,
    /// Leading context tokens removed.
    pub context_tokens_dropped: usize,
}

impl TrimmedContent {
    pub fn was_trimmed(&self) -> bool {
        self.history_dropped > 0 || self.context_tokens_dropped > 0
    }
}

/// Trims request content to a token budget.
///
/// The input is always kept whole. History goes next, oldest turns first,
/// and the context absorbs whatever budget is left by losing its leftmost
/// tokens.
#[derive(Debug, Clone, Copy)]
pub struct ContentTrimmer {
    max_tokens: usize,
}

impl ContentTrimmer {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn trim(&self, input: &str, context: &str, history: Vec<ChatTurn>) -> TrimmedContent {
        let input_tokens = count_tokens(input);
        let context_tokens = count_tokens(context);
        let mut chat_history = history;
        let turn_lengths: Vec<usize> = chat_history.iter().map(turn_chars).collect();
        let mut history_chars: usize = turn_lengths.iter().sum();
        let history_len = joined_tokens(history_chars, turn_lengths.len());
        let total_tokens = input_tokens + context_tokens + history_len;

        let mut trimmed = TrimmedContent {
            input: input.to_string(),
            context: context.to_string(),
            chat_history: Vec::new(),
            max_tokens: self.max_tokens,
            total_tokens,
            history_dropped: 0,
            context_tokens_dropped: 0,
        };

        if total_tokens <= self.max_tokens {
            trimmed.chat_history = chat_history;
            return trimmed;
        }

        // May go negative when the input alone is over budget.
        let mut remaining = self.max_tokens as i64 - input_tokens as i64;

        if history_len as i64 > remaining {
            let mut dropped = 0;
            while dropped < turn_lengths.len()
                && joined_tokens(history_chars, turn_lengths.len() - dropped) as i64 > remaining
            {
                history_chars -= turn_lengths[dropped];
                dropped += 1;
            }
            chat_history.drain(..dropped);
            trimmed.history_dropped = dropped;
            remaining = 0;
        } else {
            remaining -= history_len as i64;
        }
        trimmed.chat_history = chat_history;

        if context_tokens as i64 > remaining {
            let keep = remaining.max(0) as usize;
            let tokens = tokenize(context);
            let skip = tokens.len() - keep;
            trimmed.context = tokens[skip..].concat();
            trimmed.context_tokens_dropped = skip;
        }

        debug!(
            max_tokens = self.max_tokens,
            total_tokens,
            history_dropped = trimmed.history_dropped,
            context_tokens_dropped = trimmed.context_tokens_dropped,
            "Trimmed request content"
        );

        trimmed
    }
}
