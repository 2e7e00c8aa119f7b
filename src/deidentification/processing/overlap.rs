//! Overlap resolution
//!
//! Resolution happens in two steps. Pseudo annotations are removed together
//! with everything that overlaps them. The remaining annotations are then
//! ranked by the configured criteria and accepted greedily, best first,
//! skipping any annotation that intersects one already accepted.
//!
//! The ranking always ends with start offset, tag name, end offset and text,
//! so it is a total order and the result does not depend on iteration order.

use super::AnnotationProcessor;
use crate::deidentification::models::{Annotation, AnnotationSet, Document};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// One ranking criterion, best annotation first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Position of the tag in `tag_priority`; unlisted tags rank last
    TagPriority,
    /// Longer spans first
    Length,
    /// Annotations from earlier pipeline processors first
    AnnotatorOrder,
    /// More `+`-joined sub-tags first
    Subtags,
    /// Patient tags first
    Patient,
    /// Earlier start first
    Start,
    /// Tag names in lexicographic order
    TagName,
}

fn default_criteria() -> Vec<Criterion> {
    vec![
        Criterion::TagPriority,
        Criterion::Length,
        Criterion::AnnotatorOrder,
    ]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverlapResolverArgs {
    #[serde(default = "default_criteria")]
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub tag_priority: Vec<String>,
}

impl Default for OverlapResolverArgs {
    fn default() -> Self {
        Self {
            criteria: default_criteria(),
            tag_priority: Vec::new(),
        }
    }
}

/// Removes pseudo annotations and every annotation overlapping one
pub fn suppress_pseudo(annotations: AnnotationSet) -> AnnotationSet {
    let (pseudo, real): (Vec<Annotation>, Vec<Annotation>) =
        annotations.into_iter().partition(|a| a.tag.is_pseudo());
    if pseudo.is_empty() {
        return real.into_iter().collect();
    }

    real.into_iter()
        .filter(|a| !pseudo.iter().any(|p| p.overlaps(a)))
        .collect()
}

/// Reduces an annotation set to non-overlapping annotations
#[derive(Debug, Clone)]
pub struct OverlapResolver {
    criteria: Vec<Criterion>,
    tag_rank: HashMap<String, usize>,
}

impl Default for OverlapResolver {
    fn default() -> Self {
        Self::new(default_criteria(), Vec::new())
    }
}

impl OverlapResolver {
    pub fn new(criteria: Vec<Criterion>, tag_priority: Vec<String>) -> Self {
        let mut tag_rank = HashMap::new();
        for (rank, tag) in tag_priority.into_iter().enumerate() {
            tag_rank.entry(tag).or_insert(rank);
        }
        Self { criteria, tag_rank }
    }

    pub fn from_args(args: OverlapResolverArgs) -> std::result::Result<Self, String> {
        let mut seen = HashSet::new();
        for criterion in &args.criteria {
            if !seen.insert(criterion) {
                return Err(format!("criterion {criterion:?} is listed more than once"));
            }
        }
        let mut tags = HashSet::new();
        for tag in &args.tag_priority {
            if !tags.insert(tag) {
                return Err(format!("tag '{tag}' is listed more than once in tag_priority"));
            }
        }
        Ok(Self::new(args.criteria, args.tag_priority))
    }

    fn tag_rank(&self, annotation: &Annotation) -> usize {
        self.tag_rank
            .get(annotation.tag.as_str())
            .copied()
            .unwrap_or(self.tag_rank.len())
    }

    fn compare_by(&self, criterion: Criterion, a: &Annotation, b: &Annotation) -> Ordering {
        match criterion {
            Criterion::TagPriority => self.tag_rank(a).cmp(&self.tag_rank(b)),
            Criterion::Length => b.char_len().cmp(&a.char_len()),
            Criterion::AnnotatorOrder => a.priority.cmp(&b.priority),
            Criterion::Subtags => b.tag.subtag_count().cmp(&a.tag.subtag_count()),
            Criterion::Patient => b.tag.is_patient().cmp(&a.tag.is_patient()),
            Criterion::Start => a.start_char.cmp(&b.start_char),
            Criterion::TagName => a.tag.cmp(&b.tag),
        }
    }

    /// Total order, best annotation first
    pub fn compare(&self, a: &Annotation, b: &Annotation) -> Ordering {
        self.criteria
            .iter()
            .chain(&[Criterion::Start, Criterion::TagName])
            .map(|&criterion| self.compare_by(criterion, a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.cmp(b))
    }

    /// Resolves overlaps without needing a document
    pub fn resolve(&self, annotations: AnnotationSet) -> AnnotationSet {
        let mut candidates = suppress_pseudo(annotations).into_vec();
        candidates.sort_by(|a, b| self.compare(a, b));

        // start -> end of accepted, mutually disjoint spans
        let mut accepted: BTreeMap<usize, usize> = BTreeMap::new();
        let mut result = AnnotationSet::new();
        for candidate in candidates {
            let blocked = accepted
                .range(..candidate.end_char)
                .next_back()
                .is_some_and(|(_, &end)| end > candidate.start_char);
            if blocked {
                continue;
            }
            accepted.insert(candidate.start_char, candidate.end_char);
            result.insert(candidate);
        }
        result
    }
}

impl AnnotationProcessor for OverlapResolver {
    fn process(&self, annotations: AnnotationSet, _doc: &Document<'_>) -> AnnotationSet {
        self.resolve(annotations)
    }
}
