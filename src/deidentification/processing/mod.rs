//! Processors that rewrite a whole annotation set
//!
//! These run after the annotators of their group and replace the document's
//! annotations with their output.

pub mod merge;
pub mod overlap;
pub mod person;

pub use merge::AnnotationMerger;
pub use overlap::{suppress_pseudo, Criterion, OverlapResolver};
pub use person::PersonAnnotationConverter;

use crate::deidentification::models::{AnnotationSet, Document};
use std::fmt;

/// Capability shared by annotation set processors
pub trait AnnotationProcessor: Send + Sync + fmt::Debug {
    fn process(&self, annotations: AnnotationSet, doc: &Document<'_>) -> AnnotationSet;
}
