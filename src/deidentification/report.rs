//! Batch reporting for de-identification
//!
//! Summarizes a batch run: documents processed, annotation counts per tag,
//! consistency warnings and failures. Reports never contain source or
//! annotated text.

use crate::deidentification::models::DeidentifiedDocument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Report over a batch of documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Total documents processed successfully
    pub total_documents: usize,

    /// Total annotations over all documents
    pub total_annotations: usize,

    /// Annotations per tag
    pub annotations_by_tag: BTreeMap<String, usize>,

    /// Per-document summaries, in the order they were added
    pub documents: Vec<DocumentSummary>,

    /// Documents that could not be processed
    pub failures: Vec<BatchFailure>,

    /// Consistency warnings and other notes
    pub warnings: Vec<String>,

    /// Processing statistics
    pub stats: ProcessingStats,
}

/// Outcome for one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Caller-supplied name, e.g. the input file name
    pub name: String,

    /// Result id, matches the audit trail
    pub document_id: String,

    pub annotations: usize,

    /// Annotations per tag
    pub tag_counts: BTreeMap<String, usize>,

    pub processing_time_ms: u64,
}

/// A document that failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub name: String,
    pub error: String,
}

/// Processing statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    /// Average processing time per document (ms)
    pub avg_processing_time_ms: u64,

    /// Total processing time (ms)
    pub total_processing_time_ms: u64,

    /// Documents with at least one annotation
    pub documents_with_annotations: usize,

    /// Documents without annotations
    pub documents_without_annotations: usize,
}

impl BatchReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            total_documents: 0,
            total_annotations: 0,
            annotations_by_tag: BTreeMap::new(),
            documents: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
            stats: ProcessingStats::default(),
        }
    }

    /// Add the result for one document
    pub fn add_document(&mut self, name: impl Into<String>, document: &DeidentifiedDocument) {
        let name = name.into();
        self.total_documents += 1;
        self.stats.total_processing_time_ms += document.processing_time_ms;

        if document.has_annotations() {
            self.stats.documents_with_annotations += 1;
            self.total_annotations += document.total_annotations();
            for (tag, count) in &document.tag_counts {
                *self.annotations_by_tag.entry(tag.clone()).or_insert(0) += count;
            }
        } else {
            self.stats.documents_without_annotations += 1;
        }

        for warning in &document.warnings {
            self.warnings.push(format!("{name}: {warning}"));
        }

        self.documents.push(DocumentSummary {
            name,
            document_id: document.id.to_string(),
            annotations: document.total_annotations(),
            tag_counts: document.tag_counts.clone(),
            processing_time_ms: document.processing_time_ms,
        });

        self.stats.avg_processing_time_ms =
            self.stats.total_processing_time_ms / self.total_documents as u64;
    }

    /// Record a document that could not be processed
    pub fn add_failure(&mut self, name: impl Into<String>, error: impl std::fmt::Display) {
        self.failures.push(BatchFailure {
            name: name.into(),
            error: error.to_string(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Format report for console output
    pub fn format_console(&self) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                  DE-IDENTIFICATION REPORT                     \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output.push_str("📊 SUMMARY\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            "  Documents Processed:         {}\n",
            self.total_documents
        ));
        output.push_str(&format!(
            "  Documents with Annotations:  {}\n",
            self.stats.documents_with_annotations
        ));
        output.push_str(&format!(
            "  Documents without:           {}\n",
            self.stats.documents_without_annotations
        ));
        output.push_str(&format!("  Documents Failed:            {}\n", self.failures.len()));
        output.push_str(&format!(
            "  Total Annotations:           {}\n",
            self.total_annotations
        ));
        output.push_str(&format!(
            "  Avg Processing Time:         {} ms\n",
            self.stats.avg_processing_time_ms
        ));
        output.push('\n');

        if !self.annotations_by_tag.is_empty() {
            output.push_str("🔍 ANNOTATIONS BY TAG\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");

            let mut tags: Vec<_> = self.annotations_by_tag.iter().collect();
            tags.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

            for (tag, count) in tags {
                output.push_str(&format!("  {:30} {:>5}\n", tag, count));
            }
            output.push('\n');
        }

        if !self.failures.is_empty() {
            output.push_str("❌ FAILURES\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for failure in &self.failures {
                output.push_str(&format!("  • {}: {}\n", failure.name, failure.error));
            }
            output.push('\n');
        }

        if !self.warnings.is_empty() {
            output.push_str("⚠️  WARNINGS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for warning in &self.warnings {
                output.push_str(&format!("  • {}\n", warning));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output
    }

    /// Format report as JSON
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write report to file
    pub fn write_to_file(&self, path: &std::path::Path) -> std::io::Result<()> {
        let json = self.format_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deidentification::models::Annotation;
    use crate::domain::ConsistencyWarning;

    #[test]
    fn test_batch_report_creation() {
        let report = BatchReport::new();
        assert_eq!(report.total_documents, 0);
        assert_eq!(report.total_annotations, 0);
        assert!(report.annotations_by_tag.is_empty());
        assert!(report.warnings.is_empty());
        assert!(!report.has_failures());
    }

    #[test]
    fn test_add_document_without_annotations() {
        let mut report = BatchReport::new();
        let doc = DeidentifiedDocument::new(Vec::new(), Some("Niets".to_string()), Vec::new(), 10);

        report.add_document("leeg.txt", &doc);

        assert_eq!(report.total_documents, 1);
        assert_eq!(report.total_annotations, 0);
        assert_eq!(report.stats.documents_without_annotations, 1);
        assert_eq!(report.stats.avg_processing_time_ms, 10);
        assert_eq!(report.documents[0].name, "leeg.txt");
    }

    #[test]
    fn test_add_documents_accumulates_tags() {
        let mut report = BatchReport::new();
        let first = DeidentifiedDocument::new(
            vec![
                Annotation::new("Jan", 0, 3, "patient"),
                Annotation::new("Utrecht", 10, 17, "locatie"),
            ],
            None,
            Vec::new(),
            4,
        );
        let second = DeidentifiedDocument::new(
            vec![Annotation::new("Breda", 0, 5, "locatie")],
            None,
            Vec::new(),
            8,
        );

        report.add_document("a.txt", &first);
        report.add_document("b.txt", &second);

        assert_eq!(report.total_documents, 2);
        assert_eq!(report.total_annotations, 3);
        assert_eq!(report.annotations_by_tag.get("locatie"), Some(&2));
        assert_eq!(report.annotations_by_tag.get("patient"), Some(&1));
        assert_eq!(report.stats.avg_processing_time_ms, 6);
    }

    #[test]
    fn test_consistency_warnings_are_reported_by_name() {
        let mut report = BatchReport::new();
        let warning = ConsistencyWarning {
            tag: "datum".to_string(),
            start_char: 0,
            end_char: 5,
            recorded: "1 mei".to_string(),
            found: Some("2 mei".to_string()),
        };
        let doc = DeidentifiedDocument::new(Vec::new(), None, vec![warning], 1);

        report.add_document("brief.txt", &doc);

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("brief.txt: "));
        assert!(!report.warnings[0].contains("1 mei"));
    }

    #[test]
    fn test_format_console() {
        let mut report = BatchReport::new();
        report.total_documents = 10;
        report.total_annotations = 5;
        report.add_failure("kapot.txt", "Input error: invalid UTF-8");

        let output = report.format_console();
        assert!(output.contains("DE-IDENTIFICATION REPORT"));
        assert!(output.contains("Documents Processed:         10"));
        assert!(output.contains("kapot.txt"));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut report = BatchReport::new();
        report.add_failure("x.txt", "boom");

        report.write_to_file(&path).unwrap();

        let parsed: BatchReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.failures.len(), 1);
    }
}
