//! Annotators propose candidate spans over a document
//!
//! Every annotator is a pure function of the document: it reads the source
//! text, the token stream, the lookup snapshot, the optional patient metadata
//! and the annotations produced so far, and returns new candidates. Absence of
//! a match is never an error. Configuration problems are reported by the
//! `from_args` constructors before any document is processed.

pub mod checksum;
pub mod context;
pub mod lookup;
pub mod patient;
pub mod phone;
pub mod predicate;
pub mod regexp;
pub mod token_pattern;

pub use checksum::{ChecksumAnnotator, ChecksumRule};
pub use context::{ContextAnnotator, ContextRule};
pub use lookup::MultiTokenLookupAnnotator;
pub use patient::PatientNameAnnotator;
pub use phone::PhoneNumberAnnotator;
pub use predicate::{Direction, SequencePattern, TokenPredicate, TokenPredicateSpec};
pub use regexp::{RegexpAnnotator, RegexpPseudoAnnotator};
pub use token_pattern::TokenPatternAnnotator;

use crate::deidentification::lookup::LookupRequirement;
use crate::deidentification::models::{Annotation, Document, Tag};
use std::fmt;

/// Capability shared by all annotators
pub trait Annotator: Send + Sync + fmt::Debug {
    /// Scans the document and returns candidate annotations
    fn annotate(&self, doc: &Document<'_>) -> Vec<Annotation>;

    /// Lookup structures read while annotating
    fn required_lookups(&self) -> Vec<LookupRequirement> {
        Vec::new()
    }
}

/// Builds an annotation spanning tokens `first..=last`
pub(crate) fn token_span(
    doc: &Document<'_>,
    first: usize,
    last: usize,
    tag: &Tag,
) -> Option<Annotation> {
    let tokens = doc.tokens();
    let start = tokens.get(first)?.start_char;
    let end = tokens.get(last)?.end_char;
    Annotation::from_source(doc.text(), start, end, tag.clone())
}

/// Compiles a fancy-regex pattern and checks the capture group exists
pub(crate) fn compile_pattern(
    pattern: &str,
    capture_group: usize,
) -> std::result::Result<fancy_regex::Regex, String> {
    let regex = fancy_regex::Regex::new(pattern)
        .map_err(|e| format!("invalid pattern '{pattern}': {e}"))?;
    if capture_group >= regex.captures_len() {
        return Err(format!(
            "capture group {capture_group} does not exist in pattern '{pattern}'"
        ));
    }
    Ok(regex)
}

/// One regex match: the annotated group and the whole match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RegexHit {
    pub start: usize,
    pub end: usize,
    pub match_start: usize,
    pub match_end: usize,
}

/// Every non-overlapping match whose `capture_group` is non-empty
pub(crate) fn regex_hits(
    regex: &fancy_regex::Regex,
    text: &str,
    capture_group: usize,
) -> Vec<RegexHit> {
    let mut hits = Vec::new();
    for captures in regex.captures_iter(text) {
        match captures {
            Ok(captures) => {
                let (Some(whole), Some(group)) = (captures.get(0), captures.get(capture_group))
                else {
                    continue;
                };
                if group.start() < group.end() {
                    hits.push(RegexHit {
                        start: group.start(),
                        end: group.end(),
                        match_start: whole.start(),
                        match_end: whole.end(),
                    });
                }
            }
            Err(e) => {
                // Backtrack limit exceeded; keep what was found so far
                tracing::warn!(error = %e, "Regex matching stopped early");
                break;
            }
        }
    }
    hits
}
