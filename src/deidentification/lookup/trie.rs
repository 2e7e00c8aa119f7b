//! Token-level prefix tree for longest-match phrase lookup
//!
//! Nodes live in a flat arena and are addressed by index. The trie is built
//! once and only read afterwards; rebuilding means constructing a new trie.

use crate::deidentification::tokenizer::Token;
use rustc_hash::FxHashMap;
use serde::Deserialize;

const ROOT: usize = 0;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: FxHashMap<String, usize>,
    terminal: bool,
}

/// Settings for matching lowercase spellings of capitalized phrases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecallBoost {
    /// Minimum number of characters of a lowercase token before its
    /// title-cased form is also tried
    pub min_len: usize,
}

/// A phrase match over a token slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrieMatch {
    /// Index of the first matched token
    pub start_index: usize,

    /// Index one past the last matched token
    pub end_index: usize,
}

impl TrieMatch {
    /// Number of matched tokens
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Prefix tree keyed on token text
///
/// # Examples
///
/// ```
/// use deid::deidentification::lookup::LookupTrie;
/// use deid::deidentification::tokenizer::Tokenizer;
///
/// let mut trie = LookupTrie::new(true);
/// trie.insert(&["sint", "jans", "ziekenhuis"]);
///
/// let tokens = Tokenizer::new().tokenize("naar het sint jans ziekenhuis");
/// let m = trie.longest_match(tokens.as_slice(), 2).unwrap();
/// assert_eq!((m.start_index, m.end_index), (2, 5));
/// ```
#[derive(Debug, Clone)]
pub struct LookupTrie {
    nodes: Vec<TrieNode>,
    case_sensitive: bool,
    phrases: usize,
}

impl Default for LookupTrie {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LookupTrie {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            case_sensitive,
            phrases: 0,
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn key<'k>(&self, word: &'k str) -> std::borrow::Cow<'k, str> {
        if self.case_sensitive {
            std::borrow::Cow::Borrowed(word)
        } else {
            std::borrow::Cow::Owned(word.to_lowercase())
        }
    }

    /// Inserts a phrase given as its token texts
    ///
    /// Returns false for an empty phrase or one that was already present.
    pub fn insert<S: AsRef<str>>(&mut self, phrase: &[S]) -> bool {
        if phrase.is_empty() {
            return false;
        }

        let mut node = ROOT;
        for word in phrase {
            let key = self.key(word.as_ref()).into_owned();
            node = match self.nodes[node].children.get(&key) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(key, child);
                    child
                }
            };
        }

        let added = !self.nodes[node].terminal;
        self.nodes[node].terminal = true;
        if added {
            self.phrases += 1;
        }
        added
    }

    /// Returns true when the exact phrase is stored
    pub fn contains<S: AsRef<str>>(&self, phrase: &[S]) -> bool {
        let mut node = ROOT;
        for word in phrase {
            match self.nodes[node].children.get(self.key(word.as_ref()).as_ref()) {
                Some(&child) => node = child,
                None => return false,
            }
        }
        !phrase.is_empty() && self.nodes[node].terminal
    }

    /// Number of stored phrases
    pub fn len(&self) -> usize {
        self.phrases
    }

    pub fn is_empty(&self) -> bool {
        self.phrases == 0
    }

    fn child(&self, node: usize, word: &str) -> Option<usize> {
        self.nodes[node]
            .children
            .get(self.key(word).as_ref())
            .copied()
    }

    /// Longest stored phrase that starts at `tokens[start]`
    ///
    /// Returns `None` when no phrase starts there.
    pub fn longest_match(&self, tokens: &[Token], start: usize) -> Option<TrieMatch> {
        let mut node = ROOT;
        let mut best = None;

        for (offset, token) in tokens.get(start..)?.iter().enumerate() {
            match self.child(node, &token.text) {
                Some(child) => node = child,
                None => break,
            }
            if self.nodes[node].terminal {
                best = Some(start + offset + 1);
            }
        }

        best.map(|end_index| TrieMatch {
            start_index: start,
            end_index,
        })
    }

    /// Like [`longest_match`](Self::longest_match), but a lowercase token of
    /// at least `boost.min_len` characters may also match its title-cased
    /// spelling
    ///
    /// Both spellings are explored in parallel; the longest match wins.
    pub fn longest_match_boosted(
        &self,
        tokens: &[Token],
        start: usize,
        boost: &RecallBoost,
    ) -> Option<TrieMatch> {
        let mut frontier = vec![ROOT];
        let mut best = None;

        for (offset, token) in tokens.get(start..)?.iter().enumerate() {
            let variants = spellings(&token.text, boost.min_len);
            let mut next = Vec::with_capacity(frontier.len() * variants.len());

            for &node in &frontier {
                for variant in &variants {
                    if let Some(child) = self.child(node, variant) {
                        if !next.contains(&child) {
                            next.push(child);
                        }
                    }
                }
            }

            if next.is_empty() {
                break;
            }
            if next.iter().any(|&n| self.nodes[n].terminal) {
                best = Some(start + offset + 1);
            }
            frontier = next;
        }

        best.map(|end_index| TrieMatch {
            start_index: start,
            end_index,
        })
    }
}

fn spellings(word: &str, min_len: usize) -> Vec<String> {
    let mut variants = vec![word.to_string()];

    let is_lowercase_word = word.chars().any(char::is_alphabetic)
        && !word.chars().any(char::is_uppercase);
    if is_lowercase_word && word.chars().count() >= min_len {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            let title: String = first.to_uppercase().chain(chars).collect();
            if title != word {
                variants.push(title);
            }
        }
    }

    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deidentification::tokenizer::Tokenizer;

    fn tokens(text: &str) -> Vec<Token> {
        Tokenizer::new().tokenize(text).as_slice().to_vec()
    }

    fn hospital_trie() -> LookupTrie {
        let mut trie = LookupTrie::new(true);
        trie.insert(&["sint"]);
        trie.insert(&["sint", "jans"]);
        trie.insert(&["sint", "jans", "ziekenhuis"]);
        trie
    }

    #[test]
    fn test_prefers_longest_phrase() {
        let trie = hospital_trie();
        let toks = tokens("opname sint jans ziekenhuis gisteren");

        let m = trie.longest_match(&toks, 1).unwrap();
        assert_eq!(m, TrieMatch { start_index: 1, end_index: 4 });
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn test_falls_back_to_shorter_prefix() {
        let trie = hospital_trie();
        let toks = tokens("sint jans kliniek");

        let m = trie.longest_match(&toks, 0).unwrap();
        assert_eq!(m.end_index, 2);
    }

    #[test]
    fn test_no_match_and_out_of_range() {
        let trie = hospital_trie();
        let toks = tokens("jans ziekenhuis");

        assert!(trie.longest_match(&toks, 0).is_none());
        assert!(trie.longest_match(&toks, 10).is_none());
    }

    #[test]
    fn test_case_insensitive_trie() {
        let mut trie = LookupTrie::new(false);
        trie.insert(&["Den", "Haag"]);
        let toks = tokens("DEN haag");

        assert!(trie.longest_match(&toks, 0).is_some());
        assert!(trie.contains(&["den", "HAAG"]));
    }

    #[test]
    fn test_duplicate_insert() {
        let mut trie = LookupTrie::new(true);
        assert!(trie.insert(&["Jan"]));
        assert!(!trie.insert(&["Jan"]));
        assert!(!trie.insert::<&str>(&[]));
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_recall_boost_matches_lowercase_spelling() {
        let mut trie = LookupTrie::new(true);
        trie.insert(&["Lydia"]);
        trie.insert(&["Jos"]);
        let boost = RecallBoost { min_len: 4 };

        let lydia = tokens("lydia");
        assert!(trie.longest_match(&lydia, 0).is_none());
        assert!(trie.longest_match_boosted(&lydia, 0, &boost).is_some());

        let jos = tokens("jos");
        assert!(trie.longest_match_boosted(&jos, 0, &boost).is_none());
    }

    #[test]
    fn test_recall_boost_keeps_exact_matches() {
        let trie = hospital_trie();
        let toks = tokens("sint jans ziekenhuis");
        let boost = RecallBoost { min_len: 3 };

        let m = trie.longest_match_boosted(&toks, 0, &boost).unwrap();
        assert_eq!(m.end_index, 3);
    }
}
