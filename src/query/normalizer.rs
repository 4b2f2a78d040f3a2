//! Lexical normalization and tokenization.
//!
//! Lowercases and collapses whitespace, then splits the text into words,
//! numeric literals and comparison symbols. No stemming is done.

use std::sync::LazyLock;

use regex::Regex;

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    /// Candidate numeric literal; may still fail to parse
    Number,
    Symbol,
}

/// A token of the normalized text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Position in the token stream
    pub index: usize,
}

impl Token {
    pub fn is_number(&self) -> bool {
        self.kind == TokenKind::Number
    }
}

/// Normalized question text with its token stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedText {
    pub text: String,
    pub tokens: Vec<Token>,
}

impl NormalizedText {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Normalize raw user input.
pub fn normalize(raw: &str) -> NormalizedText {
    let text = raw
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    let tokens = tokenize(&text);
    NormalizedText { text, tokens }
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for m in TOKEN_PATTERN.find_iter(text) {
        let mut piece = m.as_str();
        let first = piece.as_bytes()[0];

        let kind = if first.is_ascii_alphabetic() || first == b'_' {
            TokenKind::Word
        } else if first.is_ascii_digit() || first == b'-' {
            TokenKind::Number
        } else {
            TokenKind::Symbol
        };

        if kind == TokenKind::Number {
            // "10-20": the dash is a separator, not a sign
            if first == b'-' && glued_to_previous(text, m.start()) {
                piece = &piece[1..];
            }
            // Sentence punctuation: "above 15."
            piece = piece.trim_end_matches('.');
        }

        tokens.push(Token {
            kind,
            text: piece.to_string(),
            index: tokens.len(),
        });
    }
    tokens
}

fn glued_to_previous(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '.')
}

// Word | signed numeric literal | comparison symbol
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-z_]+|-?[0-9][0-9.]*|>=|<=|[<>=]").expect("Invalid regex")
});

// ============================================================================
// Tests
// ============================================================================
