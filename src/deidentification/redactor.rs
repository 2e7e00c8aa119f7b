//! Placeholder redaction
//!
//! Every annotated span is replaced by `<TAG-N>`: the tag in upper case and
//! a number per tag, starting at 1 in order of first occurrence. Spans of one
//! tag with the same normalized text (case-folded, whitespace collapsed)
//! share a number. Canonical tags such as `patient` always redact to one
//! unnumbered placeholder. Text outside the spans is copied unchanged.

use crate::deidentification::lookup::within_distance;
use crate::deidentification::models::{Annotation, AnnotationSet, Tag};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// Edit distance within which a span reuses an existing number
const FUZZY_NUMBERING_EDITS: usize = 1;

fn default_open() -> String {
    "<".to_string()
}

fn default_close() -> String {
    ">".to_string()
}

fn default_canonical_tags() -> Vec<String> {
    vec!["patient".to_string()]
}

fn default_fuzzy_numbering() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedactorArgs {
    #[serde(default = "default_open")]
    pub open: String,
    #[serde(default = "default_close")]
    pub close: String,
    #[serde(default = "default_canonical_tags")]
    pub canonical_tags: Vec<String>,
    #[serde(default = "default_fuzzy_numbering")]
    pub fuzzy_numbering: bool,
}

impl Default for RedactorArgs {
    fn default() -> Self {
        Self {
            open: default_open(),
            close: default_close(),
            canonical_tags: default_canonical_tags(),
            fuzzy_numbering: default_fuzzy_numbering(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Redactor {
    open: String,
    close: String,
    canonical_tags: HashSet<String>,
    fuzzy_numbering: bool,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::from_args(RedactorArgs::default())
    }
}

/// Case-folds and collapses runs of whitespace to one space
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Numbers handed out so far, per tag
#[derive(Debug, Default)]
struct Numbering {
    seen: HashMap<Tag, Vec<String>>,
}

impl Numbering {
    fn number(&mut self, tag: &Tag, text: &str, fuzzy: bool) -> usize {
        let normalized = normalize(text);
        let seen = self.seen.entry(tag.clone()).or_default();

        if let Some(i) = seen.iter().position(|s| *s == normalized) {
            return i + 1;
        }
        if fuzzy {
            if let Some(i) = seen
                .iter()
                .position(|s| within_distance(s, &normalized, FUZZY_NUMBERING_EDITS))
            {
                return i + 1;
            }
        }

        seen.push(normalized);
        seen.len()
    }
}

impl Redactor {
    pub fn from_args(args: RedactorArgs) -> Self {
        Self {
            open: args.open,
            close: args.close,
            canonical_tags: args.canonical_tags.into_iter().collect(),
            fuzzy_numbering: args.fuzzy_numbering,
        }
    }

    fn placeholder(&self, tag: &Tag, number: Option<usize>) -> String {
        let name = tag.as_str().to_uppercase();
        match number {
            Some(n) => format!("{}{name}-{n}{}", self.open, self.close),
            None => format!("{}{name}{}", self.open, self.close),
        }
    }

    /// Rewrites `text`, replacing each annotated span with its placeholder
    ///
    /// Pseudo annotations are ignored. An annotation that overlaps an earlier
    /// one is left out rather than producing garbled output.
    pub fn redact(&self, text: &str, annotations: &AnnotationSet) -> String {
        let mut numbering = Numbering::default();
        let mut output = String::with_capacity(text.len());
        let mut cursor = 0;

        for annotation in annotations.iter().filter(|a| !a.tag.is_pseudo()) {
            if annotation.start_char < cursor {
                tracing::debug!(
                    tag = %annotation.tag,
                    start = annotation.start_char,
                    end = annotation.end_char,
                    "Skipping overlapping annotation during redaction"
                );
                continue;
            }
            let Some(before) = text.get(cursor..annotation.start_char) else {
                continue;
            };
            if text.get(annotation.start_char..annotation.end_char).is_none() {
                continue;
            }

            output.push_str(before);
            output.push_str(&self.replacement(annotation, &mut numbering));
            cursor = annotation.end_char;
        }

        output.push_str(&text[cursor..]);
        output
    }

    fn replacement(&self, annotation: &Annotation, numbering: &mut Numbering) -> String {
        if self.canonical_tags.contains(annotation.tag.as_str()) {
            return self.placeholder(&annotation.tag, None);
        }
        let n = numbering.number(&annotation.tag, &annotation.text, self.fuzzy_numbering);
        self.placeholder(&annotation.tag, Some(n))
    }
}
