//! Per-call document state flowing through the pipeline

use super::annotation::AnnotationSet;
use crate::deidentification::lookup::LookupRegistry;
use crate::deidentification::tokenizer::TokenList;
use crate::domain::Person;

/// A document being de-identified
///
/// Created per input text and discarded after redaction. Source text, tokens,
/// patient metadata and lookups are read-only; only the annotation set and
/// the redacted text change while processors run.
#[derive(Debug)]
pub struct Document<'a> {
    text: &'a str,
    tokens: TokenList,
    person: Option<&'a Person>,
    lookups: &'a LookupRegistry,
    annotations: AnnotationSet,
    redacted: Option<String>,
}

impl<'a> Document<'a> {
    pub fn new(
        text: &'a str,
        tokens: TokenList,
        person: Option<&'a Person>,
        lookups: &'a LookupRegistry,
    ) -> Self {
        Self {
            text,
            tokens,
            person,
            lookups,
            annotations: AnnotationSet::new(),
            redacted: None,
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn tokens(&self) -> &TokenList {
        &self.tokens
    }

    pub fn person(&self) -> Option<&'a Person> {
        self.person
    }

    pub fn lookups(&self) -> &'a LookupRegistry {
        self.lookups
    }

    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut AnnotationSet {
        &mut self.annotations
    }

    /// Takes the annotation set out, leaving an empty one behind
    pub fn take_annotations(&mut self) -> AnnotationSet {
        std::mem::take(&mut self.annotations)
    }

    pub fn set_annotations(&mut self, annotations: AnnotationSet) {
        self.annotations = annotations;
    }

    pub fn redacted(&self) -> Option<&str> {
        self.redacted.as_deref()
    }

    pub fn set_redacted(&mut self, redacted: String) {
        self.redacted = Some(redacted);
    }

    /// Final annotations and redacted text
    pub fn into_output(self) -> (AnnotationSet, Option<String>) {
        (self.annotations, self.redacted)
    }
}
