//! Word tokenizer.
//!
//! Splits text into word, whitespace and punctuation tokens. Every byte of
//! the input belongs to exactly one token, so concatenating token contents
//! always reproduces the input.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Run of letters, digits, apostrophes and underscores.
    Word,
    /// Run of whitespace characters.
    Whitespace,
    /// Any other single character.
    Punctuation,
}

/// A contiguous slice of the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token classification.
    pub kind: TokenKind,
    /// Exact source text.
    pub content: String,
    /// Comparison key after case and punctuation folding.
    pub normalized: String,
    /// Byte range in the source text.
    pub range: Range<usize>,
}

impl Token {
    /// Returns true if the token is only whitespace.
    pub fn is_whitespace(&self) -> bool {
        self.kind == TokenKind::Whitespace
    }
}

/// Normalization options for tokenization and comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizeOptions {
    /// Compare words case-insensitively.
    pub ignore_case: bool,
    /// Drop punctuation from comparison keys.
    pub ignore_punctuation: bool,
    /// Word tokens shorter than this many characters are merged into a neighbour.
    /// Merged tokens are classified as words.
    pub minimum_token_length: usize,
}

impl Default for TokenizeOptions {
    fn default() -> Self {
        Self {
            ignore_case: false,
            ignore_punctuation: false,
            minimum_token_length: 1,
        }
    }
}

impl TokenizeOptions {
    pub fn with_ignore_case(mut self, ignore: bool) -> Self {
        self.ignore_case = ignore;
        self
    }

    pub fn with_ignore_punctuation(mut self, ignore: bool) -> Self {
        self.ignore_punctuation = ignore;
        self
    }

    pub fn with_minimum_token_length(mut self, length: usize) -> Self {
        self.minimum_token_length = length;
        self
    }

    fn normalize(&self, content: &str) -> String {
        let folded: String = if self.ignore_punctuation {
            content.chars().filter(|c| !is_punctuation(*c)).collect()
        } else {
            content.to_string()
        };
        if self.ignore_case {
            folded.to_lowercase()
        } else {
            folded
        }
    }
}

/// Splits `text` into tokens.
pub fn tokenize(text: &str, options: &TokenizeOptions) -> Vec<Token> {
    let mut spans: Vec<(TokenKind, Range<usize>)> = Vec::new();

    for (pos, ch) in text.char_indices() {
        let kind = classify(ch);
        let end = pos + ch.len_utf8();
        match spans.last_mut() {
            Some((last_kind, range)) if *last_kind == kind && kind != TokenKind::Punctuation => {
                range.end = end;
            }
            _ => spans.push((kind, pos..end)),
        }
    }

    if options.minimum_token_length > 1 {
        spans = merge_short_words(text, spans, options.minimum_token_length);
    }

    spans
        .into_iter()
        .map(|(kind, range)| {
            let content = text[range.clone()].to_string();
            let normalized = options.normalize(&content);
            Token {
                kind,
                content,
                normalized,
                range,
            }
        })
        .collect()
}

/// Reassembles tokens into text.
pub fn concat(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.content.as_str()).collect()
}

fn classify(ch: char) -> TokenKind {
    if ch.is_whitespace() {
        TokenKind::Whitespace
    } else if is_word_char(ch) {
        TokenKind::Word
    } else {
        TokenKind::Punctuation
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '\'' || ch == '_'
}

fn is_punctuation(ch: char) -> bool {
    !ch.is_whitespace() && !ch.is_alphanumeric() && ch != '_'
}

fn merge_short_words(
    text: &str,
    spans: Vec<(TokenKind, Range<usize>)>,
    minimum: usize,
) -> Vec<(TokenKind, Range<usize>)> {
    let mut merged: Vec<(TokenKind, Range<usize>)> = Vec::with_capacity(spans.len());
    // A short word at the start of the text waits here for the next token.
    let mut carry: Option<Range<usize>> = None;

    for (kind, range) in spans {
        let short = kind == TokenKind::Word && text[range.clone()].chars().count() < minimum;

        if let Some(start) = carry.take() {
            merged.push((TokenKind::Word, start.start..range.end));
            continue;
        }

        if short {
            match merged.last_mut() {
                Some((prev_kind, prev)) => {
                    *prev_kind = TokenKind::Word;
                    prev.end = range.end;
                }
                None => carry = Some(range),
            }
        } else {
            merged.push((kind, range));
        }
    }

    if let Some(range) = carry {
        merged.push((TokenKind::Word, range));
    }
    merged
}
