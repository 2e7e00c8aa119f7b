//! De-identification result models

use super::annotation::Annotation;
use crate::domain::ConsistencyWarning;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Result of de-identifying one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeidentifiedDocument {
    /// Identifier of this result, also used in audit entries
    pub id: Uuid,

    /// Final annotations in ascending `start_char` order
    pub annotations: Vec<Annotation>,

    /// Redacted text, `None` when the redactor did not run
    pub deidentified_text: Option<String>,

    /// Annotations whose text does not match the source slice
    pub warnings: Vec<ConsistencyWarning>,

    /// Number of annotations per tag
    pub tag_counts: BTreeMap<String, usize>,

    /// Processing time in milliseconds
    pub processing_time_ms: u64,

    /// Timestamp of de-identification
    pub timestamp: DateTime<Utc>,
}

impl DeidentifiedDocument {
    pub fn new(
        annotations: Vec<Annotation>,
        deidentified_text: Option<String>,
        warnings: Vec<ConsistencyWarning>,
        processing_time_ms: u64,
    ) -> Self {
        let mut tag_counts = BTreeMap::new();
        for annotation in &annotations {
            *tag_counts
                .entry(annotation.tag.as_str().to_string())
                .or_insert(0) += 1;
        }

        Self {
            id: Uuid::new_v4(),
            annotations,
            deidentified_text,
            warnings,
            tag_counts,
            processing_time_ms,
            timestamp: Utc::now(),
        }
    }

    /// Get total number of annotations
    pub fn total_annotations(&self) -> usize {
        self.annotations.len()
    }

    /// Check if anything was annotated
    pub fn has_annotations(&self) -> bool {
        !self.annotations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_counts() {
        let doc = DeidentifiedDocument::new(
            vec![
                Annotation::new("Jan", 0, 3, "patient"),
                Annotation::new("Jansen", 20, 26, "patient"),
                Annotation::new("Utrecht", 30, 37, "locatie"),
            ],
            None,
            Vec::new(),
            3,
        );

        assert_eq!(doc.tag_counts.get("patient"), Some(&2));
        assert_eq!(doc.tag_counts.get("locatie"), Some(&1));
        assert_eq!(doc.total_annotations(), 3);
        assert!(doc.has_annotations());
    }

    #[test]
    fn test_serializes_without_priority() {
        let doc = DeidentifiedDocument::new(
            vec![Annotation::new("Jan", 0, 3, "patient").with_priority(4)],
            Some("<PATIENT>".to_string()),
            Vec::new(),
            0,
        );

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["annotations"][0]["tag"], "patient");
        assert!(json["annotations"][0].get("priority").is_none());
    }
}
