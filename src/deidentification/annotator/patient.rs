//! Matching of the patient's own name
//!
//! Uses the [`Person`](crate::domain::Person) passed with a document. First
//! names match exactly or within the scaled edit budget. A single letter that
//! starts one of the first names is an initial. The initials and the surname
//! are tokenized like the document and matched token by token, ignoring `.`
//! and `-` in between; surname tokens allow the scaled edit budget.

use super::Annotator;
use crate::deidentification::lookup::{edit_budget, within_distance};
use crate::deidentification::models::{Annotation, Document, Tag};
use crate::deidentification::processors::BuildContext;
use crate::deidentification::tokenizer::{Token, Tokenizer};
use crate::domain::Person;
use serde::Deserialize;

const SKIP_TOKENS: [&str; 2] = [".", "-"];
const PERIOD: &str = ".";

fn default_first_name_tag() -> String {
    "voornaam_patient".to_string()
}

fn default_initial_tag() -> String {
    "initiaal_patient".to_string()
}

fn default_surname_tag() -> String {
    "achternaam_patient".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientNameArgs {
    #[serde(default = "default_first_name_tag")]
    pub first_name_tag: String,
    #[serde(default = "default_initial_tag")]
    pub initial_tag: String,
    #[serde(default = "default_surname_tag")]
    pub surname_tag: String,
}

impl Default for PatientNameArgs {
    fn default() -> Self {
        Self {
            first_name_tag: default_first_name_tag(),
            initial_tag: default_initial_tag(),
            surname_tag: default_surname_tag(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PatientNameAnnotator {
    tokenizer: Tokenizer,
    first_name_tag: Tag,
    initial_tag: Tag,
    surname_tag: Tag,
}

fn is_skip(token: &Token) -> bool {
    SKIP_TOKENS.contains(&token.text.as_str())
}

impl PatientNameAnnotator {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self::with_tags(tokenizer, PatientNameArgs::default())
    }

    fn with_tags(tokenizer: Tokenizer, args: PatientNameArgs) -> Self {
        Self {
            tokenizer,
            first_name_tag: Tag::new(args.first_name_tag),
            initial_tag: Tag::new(args.initial_tag),
            surname_tag: Tag::new(args.surname_tag),
        }
    }

    pub fn from_args(
        args: PatientNameArgs,
        ctx: &BuildContext<'_>,
    ) -> std::result::Result<Self, String> {
        if [&args.first_name_tag, &args.initial_tag, &args.surname_tag]
            .iter()
            .any(|tag| tag.trim().is_empty())
        {
            return Err("patient tags must not be empty".to_string());
        }
        Ok(Self::with_tags(ctx.tokenizer.clone(), args))
    }

    /// Non-separator token texts of a metadata value
    fn pattern_words(&self, value: Option<&str>) -> Vec<String> {
        value
            .map(|v| {
                self.tokenizer
                    .words(v)
                    .into_iter()
                    .filter(|w| !SKIP_TOKENS.contains(&w.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn matches_first_name(person: &Person, token: &Token) -> bool {
        let len = token.text.chars().count();
        person
            .first_names
            .iter()
            .any(|name| within_distance(&token.text, name, edit_budget(len)))
    }

    /// An initial taken from a first name, absorbing a following period
    fn match_initial_from_name(person: &Person, tokens: &[Token], i: usize) -> Option<usize> {
        let token = &tokens[i];
        let mut chars = token.text.chars();
        let letter = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => return None,
        };

        person
            .first_names
            .iter()
            .any(|name| name.starts_with(letter))
            .then(|| absorb_period(tokens, i))
    }

    /// Matches `pattern` token by token from `start`, skipping separators
    fn match_words(tokens: &[Token], start: usize, pattern: &[String], fuzzy: bool) -> Option<usize> {
        let mut pos = start;
        for (k, word) in pattern.iter().enumerate() {
            if k > 0 {
                pos = next_non_skip(tokens, pos)?;
            }
            let text = &tokens[pos].text;
            let found = if fuzzy {
                within_distance(text, word, edit_budget(word.chars().count()))
            } else {
                text == word
            };
            if !found {
                return None;
            }
        }
        (!pattern.is_empty()).then_some(pos)
    }
}

fn next_non_skip(tokens: &[Token], pos: usize) -> Option<usize> {
    (pos + 1..tokens.len()).find(|&i| !is_skip(&tokens[i]))
}

fn absorb_period(tokens: &[Token], i: usize) -> usize {
    match tokens.get(i + 1) {
        Some(next) if next.text == PERIOD => i + 1,
        _ => i,
    }
}

impl Annotator for PatientNameAnnotator {
    fn annotate(&self, doc: &Document<'_>) -> Vec<Annotation> {
        let Some(person) = doc.person() else {
            return Vec::new();
        };
        let tokens = doc.tokens().as_slice();
        let initials = self.pattern_words(person.initials.as_deref());
        let surname = self.pattern_words(person.surname.as_deref());

        let mut annotations = Vec::new();
        let mut push = |first: usize, last: usize, tag: &Tag| {
            if let Some(annotation) = super::token_span(doc, first, last, tag) {
                annotations.push(annotation);
            }
        };

        for i in 0..tokens.len() {
            if is_skip(&tokens[i]) || tokens[i].is_newline() {
                continue;
            }

            if Self::matches_first_name(person, &tokens[i]) {
                push(i, i, &self.first_name_tag);
            }
            if let Some(end) = Self::match_initial_from_name(person, tokens, i) {
                push(i, end, &self.initial_tag);
            }
            if let Some(end) = Self::match_words(tokens, i, &initials, false) {
                push(i, absorb_period(tokens, end), &self.initial_tag);
            }
            if let Some(end) = Self::match_words(tokens, i, &surname, true) {
                push(i, end, &self.surname_tag);
            }
        }

        annotations
    }
}
