//! Post-processing of name annotations
//!
//! Runs at the end of the names group and sees every annotation present at
//! that point.

use super::overlap::{Criterion, OverlapResolver};
use super::AnnotationProcessor;
use crate::deidentification::models::{AnnotationSet, Document, Tag};
use serde::Deserialize;

const PATIENT_TAG: &str = "patient";
const PERSON_TAG: &str = "persoon";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonConverterArgs {}

/// Turns compound name annotations into `patient` or `persoon`
///
/// Pseudo annotations and everything overlapping them are dropped. A
/// non-patient name annotation lying within the span of a patient annotation
/// is dropped too, so the patient reading of a span always wins. The
/// remaining overlaps are resolved preferring more sub-tags, then patient
/// tags, then longer spans. A tag whose every sub-tag refers to the patient
/// becomes `patient`; anything else becomes `persoon`.
#[derive(Debug, Clone)]
pub struct PersonAnnotationConverter {
    resolver: OverlapResolver,
}

impl Default for PersonAnnotationConverter {
    fn default() -> Self {
        Self {
            resolver: OverlapResolver::new(
                vec![Criterion::Subtags, Criterion::Patient, Criterion::Length],
                Vec::new(),
            ),
        }
    }
}

impl PersonAnnotationConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_args(_args: PersonConverterArgs) -> std::result::Result<Self, String> {
        Ok(Self::new())
    }

    fn resolve_tag(tag: &Tag) -> &'static str {
        if tag.is_patient() {
            PATIENT_TAG
        } else {
            PERSON_TAG
        }
    }

    fn drop_shadowed_by_patient(annotations: AnnotationSet) -> AnnotationSet {
        let patient_spans: Vec<(usize, usize)> = annotations
            .iter()
            .filter(|a| a.tag.is_patient())
            .map(|a| (a.start_char, a.end_char))
            .collect();

        if patient_spans.is_empty() {
            return annotations;
        }

        annotations
            .into_iter()
            .filter(|a| {
                a.tag.is_patient()
                    || a.tag.is_pseudo()
                    || !patient_spans
                        .iter()
                        .any(|&(start, end)| start <= a.start_char && a.end_char <= end)
            })
            .collect()
    }

    pub fn convert(&self, annotations: AnnotationSet) -> AnnotationSet {
        self.resolver
            .resolve(Self::drop_shadowed_by_patient(annotations))
            .into_iter()
            .filter(|a| !a.text.trim().is_empty())
            .map(|a| {
                let tag = Self::resolve_tag(&a.tag);
                a.retagged(tag)
            })
            .collect()
    }
}

impl AnnotationProcessor for PersonAnnotationConverter {
    fn process(&self, annotations: AnnotationSet, _doc: &Document<'_>) -> AnnotationSet {
        self.convert(annotations)
    }
}
