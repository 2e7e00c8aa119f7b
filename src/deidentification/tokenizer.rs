//! Tokenizer producing an ordered, offset-addressable token stream
//!
//! A token is a maximal run of alphanumeric characters, a single newline, or a
//! single other non-whitespace character. Whitespace other than `\n` is
//! skipped; offsets always refer to the original text.

use crate::deidentification::lookup::LookupTrie;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single token of a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Exact source slice
    pub text: String,

    /// Byte offset of the first character
    pub start_char: usize,

    /// Byte offset one past the last character
    pub end_char: usize,

    /// Position in the token stream
    pub index: usize,
}

impl Token {
    /// Returns true for the newline token
    pub fn is_newline(&self) -> bool {
        self.text == "\n"
    }
}

/// Lazy iterator over the raw tokens of a text
///
/// Restartable by calling [`split`] again; the iterator borrows the text and
/// holds no other state.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    text: &'a str,
    pos: usize,
    index: usize,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let rest = &self.text[self.pos..];
        let skipped = rest
            .char_indices()
            .find(|&(_, c)| c == '\n' || !c.is_whitespace())
            .map(|(i, _)| i)?;

        let start = self.pos + skipped;
        let mut chars = self.text[start..].chars();
        let first = chars.next()?;

        let end = if first.is_alphanumeric() {
            let run: usize = self.text[start..]
                .chars()
                .take_while(|c| c.is_alphanumeric())
                .map(char::len_utf8)
                .sum();
            start + run
        } else {
            start + first.len_utf8()
        };

        let token = Token {
            text: self.text[start..end].to_string(),
            start_char: start,
            end_char: end,
            index: self.index,
        };

        self.pos = end;
        self.index += 1;
        Some(token)
    }
}

/// Splits `text` into raw tokens, without merging any terms
///
/// # Examples
///
/// ```
/// use deid::deidentification::tokenizer::split;
///
/// let words: Vec<String> = split("Dr. A.B. de Visser").map(|t| t.text).collect();
/// assert_eq!(words, ["Dr", ".", "A", ".", "B", ".", "de", "Visser"]);
/// ```
pub fn split(text: &str) -> Tokens<'_> {
    Tokens {
        text,
        pos: 0,
        index: 0,
    }
}

/// Tokenizer with optional multi-token merge terms
///
/// Merge terms (for example the interfix `van der`) are matched longest-first
/// over the raw token stream and collapsed into a single token whose text is
/// the exact source slice.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    merge_terms: Option<Arc<LookupTrie>>,
}

impl Tokenizer {
    /// Creates a tokenizer without merge terms
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tokenizer that merges the given multi-token terms
    pub fn with_merge_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trie = LookupTrie::new(false);
        for term in terms {
            let words: Vec<String> = split(term.as_ref()).map(|t| t.text).collect();
            if words.len() > 1 {
                trie.insert(words.as_slice());
            }
        }

        if trie.is_empty() {
            Self::default()
        } else {
            Self {
                merge_terms: Some(Arc::new(trie)),
            }
        }
    }

    /// Lazy raw token stream (merge terms are not applied)
    pub fn split<'a>(&self, text: &'a str) -> Tokens<'a> {
        split(text)
    }

    /// Tokenizes `text` into an indexed [`TokenList`], applying merge terms
    pub fn tokenize(&self, text: &str) -> TokenList {
        let raw: Vec<Token> = split(text).collect();

        let Some(trie) = &self.merge_terms else {
            return TokenList::new(raw);
        };

        let mut merged = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            match trie.longest_match(&raw, i) {
                Some(m) if m.len() > 1 => {
                    let start = raw[m.start_index].start_char;
                    let end = raw[m.end_index - 1].end_char;
                    merged.push(Token {
                        text: text[start..end].to_string(),
                        start_char: start,
                        end_char: end,
                        index: merged.len(),
                    });
                    i = m.end_index;
                }
                _ => {
                    let mut token = raw[i].clone();
                    token.index = merged.len();
                    merged.push(token);
                    i += 1;
                }
            }
        }

        TokenList::new(merged)
    }

    /// Token texts of `text`, as used for building lookup tries
    pub fn words(&self, text: &str) -> Vec<String> {
        self.tokenize(text)
            .iter()
            .map(|token| token.text.clone())
            .collect()
    }
}

/// Ordered token sequence with offset-based binary search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenList {
    tokens: Vec<Token>,
}

impl TokenList {
    /// Wraps already indexed tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    /// Token containing the byte `offset`, if any
    pub fn token_at(&self, offset: usize) -> Option<&Token> {
        let idx = self.tokens.partition_point(|t| t.end_char <= offset);
        self.tokens
            .get(idx)
            .filter(|t| t.start_char <= offset && offset < t.end_char)
    }

    /// Token containing `offset`, or the closest token by character distance
    ///
    /// Ties between a preceding and a following token go to the preceding one.
    pub fn nearest(&self, offset: usize) -> Option<&Token> {
        if let Some(token) = self.token_at(offset) {
            return Some(token);
        }

        let after = self.index_at_or_after(offset).and_then(|i| self.get(i));
        let before = self.index_at_or_before(offset).and_then(|i| self.get(i));

        match (before, after) {
            (Some(b), Some(a)) => {
                if offset - b.end_char <= a.start_char - offset {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (b, a) => b.or(a),
        }
    }

    /// Index of the first token starting at or after `offset`
    pub fn index_at_or_after(&self, offset: usize) -> Option<usize> {
        let idx = self.tokens.partition_point(|t| t.start_char < offset);
        (idx < self.tokens.len()).then_some(idx)
    }

    /// Index of the last token ending at or before `offset`
    pub fn index_at_or_before(&self, offset: usize) -> Option<usize> {
        let idx = self.tokens.partition_point(|t| t.end_char <= offset);
        idx.checked_sub(1)
    }

    /// First and last token index touched by the byte range `[start, end)`
    pub fn span_indices(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let first = self.tokens.partition_point(|t| t.end_char <= start);
        let last = self.tokens.partition_point(|t| t.start_char < end);
        if first < last {
            Some((first, last - 1))
        } else {
            None
        }
    }
}

impl<'a> IntoIterator for &'a TokenList {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
