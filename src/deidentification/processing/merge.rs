//! Merging of adjacent annotations with the same tag

use super::AnnotationProcessor;
use crate::deidentification::models::{Annotation, AnnotationSet, Document, Tag};
use serde::Deserialize;

const PATIENT_TAG: &str = "patient";
const PERSON_TAG: &str = "persoon";

fn default_separators() -> String {
    " -".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeArgs {
    /// Characters allowed between two annotations that are merged
    #[serde(default = "default_separators")]
    pub separators: String,
    /// Also join a `patient` annotation with a neighbouring `persoon`
    #[serde(default)]
    pub patient_aware: bool,
}

impl Default for MergeArgs {
    fn default() -> Self {
        Self {
            separators: default_separators(),
            patient_aware: false,
        }
    }
}

/// Fuses consecutive annotations with equal tags
///
/// Two annotations merge when everything between them is a separator
/// character (by default a space or a hyphen). A newline, a tab or a comma
/// keeps them apart. Expects non-overlapping input.
///
/// In patient-aware mode a `patient` next to a `persoon`, in either order,
/// joins into one `persoon` (as in a double-barrelled surname of which only
/// one half is the patient's).
///
/// # Examples
///
/// ```
/// use deid::deidentification::models::{Annotation, AnnotationSet};
/// use deid::deidentification::processing::AnnotationMerger;
///
/// let text = "Amsterdam Zuid";
/// let set: AnnotationSet = vec![
///     Annotation::new("Amsterdam", 0, 9, "locatie"),
///     Annotation::new("Zuid", 10, 14, "locatie"),
/// ]
/// .into_iter()
/// .collect();
///
/// let merged = AnnotationMerger::default().merge(set, text);
/// assert_eq!(merged.iter().next().unwrap().text, "Amsterdam Zuid");
/// ```
#[derive(Debug, Clone)]
pub struct AnnotationMerger {
    separators: Vec<char>,
    patient_aware: bool,
}

impl Default for AnnotationMerger {
    fn default() -> Self {
        Self::new(&default_separators())
    }
}

impl AnnotationMerger {
    pub fn new(separators: &str) -> Self {
        Self {
            separators: separators.chars().collect(),
            patient_aware: false,
        }
    }

    pub fn with_patient_aware(mut self, patient_aware: bool) -> Self {
        self.patient_aware = patient_aware;
        self
    }

    pub fn from_args(args: MergeArgs) -> std::result::Result<Self, String> {
        if let Some(c) = args.separators.chars().find(|c| *c == '\n') {
            return Err(format!("{c:?} cannot be a merge separator"));
        }
        Ok(Self::new(&args.separators).with_patient_aware(args.patient_aware))
    }

    /// Tag of the merged annotation, `None` when the tags do not join
    fn joined_tag(&self, left: &Tag, right: &Tag) -> Option<Tag> {
        if left == right {
            return Some(left.clone());
        }
        let mixed = matches!(
            (left.as_str(), right.as_str()),
            (PATIENT_TAG, PERSON_TAG) | (PERSON_TAG, PATIENT_TAG)
        );
        (self.patient_aware && mixed).then(|| Tag::new(PERSON_TAG))
    }

    fn join(&self, text: &str, left: &Annotation, right: &Annotation) -> Option<Annotation> {
        if left.end_char > right.start_char {
            return None;
        }
        let gap = text.get(left.end_char..right.start_char)?;
        if !gap.chars().all(|c| self.separators.contains(&c)) {
            return None;
        }
        let tag = self.joined_tag(&left.tag, &right.tag)?;
        Annotation::from_source(text, left.start_char, right.end_char, tag)
            .map(|joined| joined.with_priority(left.priority.min(right.priority)))
    }

    pub fn merge(&self, annotations: AnnotationSet, text: &str) -> AnnotationSet {
        let mut merged: Vec<Annotation> = Vec::with_capacity(annotations.len());

        for annotation in annotations {
            let joined = merged
                .last()
                .and_then(|last| self.join(text, last, &annotation));

            match joined {
                Some(joined) => {
                    if let Some(last) = merged.last_mut() {
                        *last = joined;
                    }
                }
                None => merged.push(annotation),
            }
        }

        merged.into_iter().collect()
    }
}

impl AnnotationProcessor for AnnotationMerger {
    fn process(&self, annotations: AnnotationSet, doc: &Document<'_>) -> AnnotationSet {
        self.merge(annotations, doc.text())
    }
}
