//! Annotation data models

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

const PSEUDO_MARKER: &str = "pseudo";
const PATIENT_MARKER: &str = "patient";

/// Category label of an annotation
///
/// Compound tags join sub-tags with `+` (for example
/// `initiaal+interfix+achternaam`). A tag is a pseudo tag when any sub-tag
/// starts with `pseudo`; pseudo tags only suppress other annotations and never
/// reach the output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Sub-tags in textual order
    pub fn parts(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0.split('+')
    }

    pub fn subtag_count(&self) -> usize {
        self.parts().count()
    }

    pub fn is_pseudo(&self) -> bool {
        self.parts().any(|part| part.starts_with(PSEUDO_MARKER))
    }

    /// True when every sub-tag refers to the patient
    pub fn is_patient(&self) -> bool {
        self.parts().all(|part| part.contains(PATIENT_MARKER))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for Tag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A detected span of sensitive text
///
/// `text` always equals `source[start_char..end_char]`; offsets are byte
/// offsets on char boundaries. Equality, hashing and ordering ignore
/// `priority`, which only records the pipeline position of the processor
/// that produced the annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    /// Exact source slice
    pub text: String,

    /// Start byte offset (inclusive)
    pub start_char: usize,

    /// End byte offset (exclusive)
    pub end_char: usize,

    /// Category
    pub tag: Tag,

    /// Position of the producing processor in the pipeline
    #[serde(skip)]
    pub priority: usize,
}

impl Annotation {
    pub fn new(
        text: impl Into<String>,
        start_char: usize,
        end_char: usize,
        tag: impl Into<Tag>,
    ) -> Self {
        Self {
            text: text.into(),
            start_char,
            end_char,
            tag: tag.into(),
            priority: 0,
        }
    }

    /// Creates an annotation over `source[start_char..end_char]`
    ///
    /// Returns `None` if the range is empty, out of bounds or not on char
    /// boundaries.
    pub fn from_source(
        source: &str,
        start_char: usize,
        end_char: usize,
        tag: impl Into<Tag>,
    ) -> Option<Self> {
        if start_char >= end_char {
            return None;
        }
        let text = source.get(start_char..end_char)?;
        Some(Self::new(text, start_char, end_char, tag))
    }

    pub fn with_priority(mut self, priority: usize) -> Self {
        self.priority = priority;
        self
    }

    /// Same span with another tag
    pub fn retagged(&self, tag: impl Into<Tag>) -> Self {
        Self {
            text: self.text.clone(),
            start_char: self.start_char,
            end_char: self.end_char,
            tag: tag.into(),
            priority: self.priority,
        }
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn overlaps(&self, other: &Annotation) -> bool {
        self.start_char < other.end_char && other.start_char < self.end_char
    }

    /// True when `text` matches the live slice of `source`
    pub fn is_consistent_with(&self, source: &str) -> bool {
        source.get(self.start_char..self.end_char) == Some(self.text.as_str())
    }

    fn key(&self) -> (usize, usize, &Tag, &str) {
        (self.start_char, self.end_char, &self.tag, &self.text)
    }
}

impl PartialEq for Annotation {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Annotation {}

impl Hash for Annotation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Annotation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Annotation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Set of annotations for one document, iterated in `start_char` order
///
/// Inserting an annotation identical to one already present keeps the
/// existing one (and its priority).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationSet {
    annotations: BTreeSet<Annotation>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an annotation, returning false if an identical one was present
    pub fn insert(&mut self, annotation: Annotation) -> bool {
        self.annotations.insert(annotation)
    }

    pub fn remove(&mut self, annotation: &Annotation) -> bool {
        self.annotations.remove(annotation)
    }

    pub fn contains(&self, annotation: &Annotation) -> bool {
        self.annotations.contains(annotation)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Iterates in ascending `start_char` order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Annotation> {
        self.annotations.iter()
    }

    /// Returns true when some pair of annotations intersects
    pub fn has_overlaps(&self) -> bool {
        let mut furthest_end = 0;
        for (i, annotation) in self.annotations.iter().enumerate() {
            if i > 0 && annotation.start_char < furthest_end {
                return true;
            }
            furthest_end = furthest_end.max(annotation.end_char);
        }
        false
    }

    /// Annotations whose span covers the byte range `[start, end)`
    pub fn covering(&self, start: usize, end: usize) -> impl Iterator<Item = &Annotation> {
        self.annotations
            .iter()
            .take_while(move |a| a.start_char <= start)
            .filter(move |a| a.end_char >= end)
    }

    pub fn into_vec(self) -> Vec<Annotation> {
        self.annotations.into_iter().collect()
    }
}

impl FromIterator<Annotation> for AnnotationSet {
    fn from_iter<I: IntoIterator<Item = Annotation>>(iter: I) -> Self {
        Self {
            annotations: iter.into_iter().collect(),
        }
    }
}

impl Extend<Annotation> for AnnotationSet {
    fn extend<I: IntoIterator<Item = Annotation>>(&mut self, iter: I) {
        self.annotations.extend(iter);
    }
}

impl IntoIterator for AnnotationSet {
    type Item = Annotation;
    type IntoIter = std::collections::btree_set::IntoIter<Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.annotations.into_iter()
    }
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a Annotation;
    type IntoIter = std::collections::btree_set::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.annotations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_properties() {
        let tag = Tag::new("voornaam_patient+achternaam_patient");
        assert!(tag.is_patient());
        assert!(!tag.is_pseudo());
        assert_eq!(tag.subtag_count(), 2);

        let mixed = Tag::new("voornaam_patient+naam");
        assert!(!mixed.is_patient());

        assert!(Tag::new("pseudo_naam").is_pseudo());
        assert!(Tag::new("achternaam+pseudo_naam").is_pseudo());
    }

    #[test]
    fn test_from_source_checks_bounds() {
        let text = "Zoë Jansen";
        assert!(Annotation::from_source(text, 0, 4, "voornaam").is_some());
        assert!(Annotation::from_source(text, 0, 3, "voornaam").is_none());
        assert!(Annotation::from_source(text, 5, 50, "achternaam").is_none());
        assert!(Annotation::from_source(text, 4, 4, "achternaam").is_none());
    }

    #[test]
    fn test_equality_ignores_priority() {
        let a = Annotation::new("Jan", 0, 3, "voornaam").with_priority(1);
        let b = Annotation::new("Jan", 0, 3, "voornaam").with_priority(7);
        assert_eq!(a, b);

        let mut set = AnnotationSet::new();
        assert!(set.insert(a));
        assert!(!set.insert(b));
        assert_eq!(set.iter().next().unwrap().priority, 1);
    }

    #[test]
    fn test_iteration_is_sorted_by_start() {
        let set: AnnotationSet = vec![
            Annotation::new("b", 5, 6, "x"),
            Annotation::new("a", 0, 1, "x"),
            Annotation::new("c", 9, 10, "x"),
        ]
        .into_iter()
        .collect();

        let starts: Vec<usize> = set.iter().map(|a| a.start_char).collect();
        assert_eq!(starts, vec![0, 5, 9]);
    }

    #[test]
    fn test_has_overlaps() {
        let disjoint: AnnotationSet = vec![
            Annotation::new("Jan", 0, 3, "x"),
            Annotation::new("Jansen", 4, 10, "x"),
        ]
        .into_iter()
        .collect();
        assert!(!disjoint.has_overlaps());

        let nested: AnnotationSet = vec![
            Annotation::new("Jan Jansen", 0, 10, "x"),
            Annotation::new("Jansen", 4, 10, "y"),
        ]
        .into_iter()
        .collect();
        assert!(nested.has_overlaps());
    }

    #[test]
    fn test_covering() {
        let set: AnnotationSet = vec![
            Annotation::new("Jan Jansen", 0, 10, "a"),
            Annotation::new("Jansen", 4, 10, "b"),
            Annotation::new("Jan", 0, 3, "c"),
        ]
        .into_iter()
        .collect();

        let tags: Vec<&str> = set.covering(4, 10).map(|a| a.tag.as_str()).collect();
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn test_consistency_check() {
        let source = "bij Jansen";
        assert!(Annotation::new("Jansen", 4, 10, "x").is_consistent_with(source));
        assert!(!Annotation::new("jansen", 4, 10, "x").is_consistent_with(source));
        assert!(!Annotation::new("Jansen", 40, 46, "x").is_consistent_with(source));
    }
}
