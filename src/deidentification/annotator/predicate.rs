//! Token predicates and token sequence patterns
//!
//! Predicates are configured as single-key tables, for example
//! `{ lowercase_lookup = "prefixes" }` or `{ and = [{ like_name = true }, { min_len = 4 }] }`.

use crate::deidentification::lookup::{LookupRegistry, LookupRequirement};
use crate::deidentification::models::Document;
use crate::deidentification::tokenizer::Token;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;

/// Tokens that count as an initial despite having more than one letter
const MULTI_LETTER_INITIALS: [&str; 4] = ["Ch", "Chr", "Ph", "Th"];

/// Configured form of a token predicate
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPredicateSpec {
    /// Token text equals the value
    Equal(String),
    /// Regex matches at the start of the token text
    ReMatch(String),
    /// Single capital letter (or `Ch`, `Chr`, `Ph`, `Th`)
    IsInitial(bool),
    /// Up to four capital letters
    IsInitials(bool),
    /// Capitalized word of at least three letters without digits
    LikeName(bool),
    StartsWithCapital(bool),
    MinLen(usize),
    /// Token text is in the named set
    Lookup(String),
    NegLookup(String),
    /// Lowercased token text is in the named set
    LowercaseLookup(String),
    LowercaseNegLookup(String),
    /// Token lies inside an existing annotation with one of these tags
    Tagged(#[serde(deserialize_with = "string_or_list")] Vec<String>),
    And(Vec<TokenPredicateSpec>),
    Or(Vec<TokenPredicateSpec>),
}

/// Accepts either a single string or a list of strings
pub(crate) fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// Compiled token predicate
#[derive(Debug, Clone)]
pub enum TokenPredicate {
    Equal(String),
    ReMatch(Regex),
    IsInitial(bool),
    IsInitials(bool),
    LikeName(bool),
    StartsWithCapital(bool),
    MinLen(usize),
    Lookup {
        name: String,
        negate: bool,
        lowercase: bool,
    },
    Tagged(Vec<String>),
    And(Vec<TokenPredicate>),
    Or(Vec<TokenPredicate>),
}

impl TokenPredicate {
    /// Compiles a predicate, checking regexes and lookup names
    ///
    /// # Errors
    ///
    /// Returns a message for an invalid regex, an unknown lookup or a lookup
    /// that is not a set.
    pub fn compile(
        spec: &TokenPredicateSpec,
        lookups: &LookupRegistry,
    ) -> std::result::Result<Self, String> {
        let lookup = |name: &str, negate: bool, lowercase: bool| {
            if lookups.set(name).is_none() {
                return Err(format!("token predicate refers to unknown lookup set '{name}'"));
            }
            Ok(TokenPredicate::Lookup {
                name: name.to_string(),
                negate,
                lowercase,
            })
        };

        Ok(match spec {
            TokenPredicateSpec::Equal(value) => TokenPredicate::Equal(value.clone()),
            TokenPredicateSpec::ReMatch(pattern) => {
                let anchored = format!("^(?:{pattern})");
                let regex = Regex::new(&anchored)
                    .map_err(|e| format!("invalid re_match pattern '{pattern}': {e}"))?;
                TokenPredicate::ReMatch(regex)
            }
            TokenPredicateSpec::IsInitial(value) => TokenPredicate::IsInitial(*value),
            TokenPredicateSpec::IsInitials(value) => TokenPredicate::IsInitials(*value),
            TokenPredicateSpec::LikeName(value) => TokenPredicate::LikeName(*value),
            TokenPredicateSpec::StartsWithCapital(value) => {
                TokenPredicate::StartsWithCapital(*value)
            }
            TokenPredicateSpec::MinLen(len) => TokenPredicate::MinLen(*len),
            TokenPredicateSpec::Lookup(name) => lookup(name, false, false)?,
            TokenPredicateSpec::NegLookup(name) => lookup(name, true, false)?,
            TokenPredicateSpec::LowercaseLookup(name) => lookup(name, false, true)?,
            TokenPredicateSpec::LowercaseNegLookup(name) => lookup(name, true, true)?,
            TokenPredicateSpec::Tagged(tags) => TokenPredicate::Tagged(tags.clone()),
            TokenPredicateSpec::And(specs) => TokenPredicate::And(
                specs
                    .iter()
                    .map(|s| Self::compile(s, lookups))
                    .collect::<std::result::Result<_, _>>()?,
            ),
            TokenPredicateSpec::Or(specs) => TokenPredicate::Or(
                specs
                    .iter()
                    .map(|s| Self::compile(s, lookups))
                    .collect::<std::result::Result<_, _>>()?,
            ),
        })
    }

    /// Adds the lookup sets this predicate reads to `out`
    pub fn collect_requirements(&self, out: &mut Vec<LookupRequirement>) {
        match self {
            TokenPredicate::Lookup { name, .. } => out.push(LookupRequirement::set(name.clone())),
            TokenPredicate::And(inner) | TokenPredicate::Or(inner) => {
                for predicate in inner {
                    predicate.collect_requirements(out);
                }
            }
            _ => {}
        }
    }

    pub fn matches(&self, token: &Token, doc: &Document<'_>) -> bool {
        let text = token.text.as_str();
        match self {
            TokenPredicate::Equal(value) => text == value,
            TokenPredicate::ReMatch(regex) => regex.is_match(text),
            TokenPredicate::IsInitial(expected) => is_initial(text) == *expected,
            TokenPredicate::IsInitials(expected) => is_initials(text) == *expected,
            TokenPredicate::LikeName(expected) => like_name(text) == *expected,
            TokenPredicate::StartsWithCapital(expected) => {
                starts_with_capital(text) == *expected
            }
            TokenPredicate::MinLen(len) => text.chars().count() >= *len,
            TokenPredicate::Lookup {
                name,
                negate,
                lowercase,
            } => {
                let Some(set) = doc.lookups().set(name) else {
                    return false;
                };
                let found = if *lowercase {
                    set.contains(&text.to_lowercase())
                } else {
                    set.contains(text)
                };
                found != *negate
            }
            TokenPredicate::Tagged(tags) => doc
                .annotations()
                .covering(token.start_char, token.end_char)
                .any(|annotation| tags.iter().any(|tag| annotation.tag == tag.as_str())),
            TokenPredicate::And(inner) => inner.iter().all(|p| p.matches(token, doc)),
            TokenPredicate::Or(inner) => inner.iter().any(|p| p.matches(token, doc)),
        }
    }
}

fn starts_with_capital(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_uppercase)
}

fn is_initial(text: &str) -> bool {
    let mut chars = text.chars();
    let single_capital = matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase());
    single_capital || MULTI_LETTER_INITIALS.contains(&text)
}

fn is_initials(text: &str) -> bool {
    let len = text.chars().count();
    (1..=4).contains(&len) && text.chars().all(char::is_uppercase)
}

fn like_name(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    text.chars().count() >= 3
        && first.is_uppercase()
        && chars.all(|c| c.is_alphabetic() && !c.is_uppercase())
}

/// Direction in which a sequence pattern walks the token stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    #[default]
    Right,
}

/// Ordered token predicates with separator tokens allowed in between
///
/// Elements are listed in textual (left-to-right) order regardless of the
/// walking direction.
#[derive(Debug, Clone)]
pub struct SequencePattern {
    pub direction: Direction,
    pub skip: HashSet<String>,
    /// Maximum number of consecutive skip tokens between two elements,
    /// unbounded when `None`
    pub max_skip: Option<usize>,
    pub elements: Vec<TokenPredicate>,
}

impl SequencePattern {
    fn step(&self, pos: usize, len: usize) -> Option<usize> {
        match self.direction {
            Direction::Right => (pos + 1 < len).then_some(pos + 1),
            Direction::Left => pos.checked_sub(1),
        }
    }

    /// Matches the pattern anchored at token `start`
    ///
    /// Returns the index of the last token consumed, which lies to the right
    /// of `start` for [`Direction::Right`] and to the left otherwise.
    pub fn match_at(&self, doc: &Document<'_>, start: usize) -> Option<usize> {
        let tokens = doc.tokens().as_slice();
        if start >= tokens.len() || self.elements.is_empty() {
            return None;
        }

        let ordered: Box<dyn Iterator<Item = &TokenPredicate>> = match self.direction {
            Direction::Right => Box::new(self.elements.iter()),
            Direction::Left => Box::new(self.elements.iter().rev()),
        };

        let mut pos = start;
        for (i, element) in ordered.enumerate() {
            if i > 0 {
                pos = self.step(pos, tokens.len())?;
                let mut skipped = 0;
                while self.skip.contains(&tokens[pos].text) {
                    skipped += 1;
                    if self.max_skip.is_some_and(|max| skipped > max) {
                        return None;
                    }
                    pos = self.step(pos, tokens.len())?;
                }
            }
            if !element.matches(&tokens[pos], doc) {
                return None;
            }
        }

        Some(pos)
    }

    /// Matches the pattern starting next to token `boundary`, after passing
    /// any skip tokens
    pub fn match_after(&self, doc: &Document<'_>, boundary: usize) -> Option<usize> {
        let tokens = doc.tokens().as_slice();
        let mut pos = self.step(boundary, tokens.len())?;
        while self.skip.contains(&tokens[pos].text) {
            pos = self.step(pos, tokens.len())?;
        }
        self.match_at(doc, pos)
    }

    pub fn collect_requirements(&self, out: &mut Vec<LookupRequirement>) {
        for element in &self.elements {
            element.collect_requirements(out);
        }
    }
}
