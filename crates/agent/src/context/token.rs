//! Token estimation utilities.
//!
//! A token is a fixed run of 4 characters. This is a cheap stand-in for the
//! engine's real tokenizer, used only for budget accounting; it knows
//! nothing about words or the model's vocabulary.

use banter_core::session::ChatTurn;

/// Characters per token.
pub const TOKEN_SIZE: usize = 4;

/// Split `text` into consecutive, non-overlapping chunks of [`TOKEN_SIZE`]
/// characters. The last chunk may be shorter. Chunks never split a
/// multi-byte character.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::with_capacity(count_tokens(text));
    let mut start = 0;
    for (n, (idx, _)) in text.char_indices().enumerate() {
        if n > 0 && n % TOKEN_SIZE == 0 {
            tokens.push(&text[start..idx]);
            start = idx;
        }
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Number of tokens in `text`: `ceil(chars / 4)`.
pub fn count_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(TOKEN_SIZE)
}

/// Characters one turn contributes to the joined history string:
/// `"{input} {response}"`.
pub fn turn_chars(turn: &ChatTurn) -> usize {
    turn.input.chars().count() + 1 + turn.response.chars().count()
}

/// Tokens in a history of `turns` entries whose [`turn_chars`] sum to
/// `chars`, joined by single spaces.
pub fn joined_tokens(chars: usize, turns: usize) -> usize {
    match turns {
        0 => 0,
        n => (chars + n - 1).div_ceil(TOKEN_SIZE),
    }
}

/// Token count of the history as one string: `"{input} {response}"` per
/// turn, joined by a space.
#[cfg(test)]
pub(crate) fn history_tokens(history: &[ChatTurn]) -> usize {
    joined_tokens(history.iter().map(turn_chars).sum(), history.len())
}
