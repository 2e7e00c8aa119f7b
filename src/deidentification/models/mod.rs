//! Data models for de-identification

pub mod annotation;
pub mod deidentified;
pub mod document;

pub use annotation::{Annotation, AnnotationSet, Tag};
pub use deidentified::DeidentifiedDocument;
pub use document::Document;
