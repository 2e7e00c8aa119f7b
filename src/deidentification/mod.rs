//! De-identification of free-form clinical text
//!
//! Rule-based detection of protected health information (PHI) in Dutch
//! clinical notes, followed by replacement with category placeholders.
//!
//! # Architecture
//!
//! A document flows through an ordered [`Pipeline`] of processors:
//! - **Annotators** find candidate spans: regular expressions, vocabulary
//!   lookups, token patterns, context rules, checksum-validated identifiers and
//!   the patient's own name
//! - **Annotation processors** resolve overlaps, merge adjacent spans and
//!   convert name annotations to person or patient tags
//! - The **redactor** replaces every remaining span with a placeholder such as
//!   `<PERSOON-1>` or `<PATIENT>`
//!
//! [`DeidEngine`] owns the pipeline together with the tokenizer, the versioned
//! lookup structures and the audit logger.
//!
//! # Usage
//!
//! ```rust,no_run
//! use deid::deidentification::{DeidEngine, Selection};
//!
//! # fn example() -> deid::domain::Result<()> {
//! let engine = DeidEngine::from_default_config()?;
//! let result = engine.deidentify("Controle op 12 maart in Utrecht.", None, &Selection::All)?;
//! println!("{}", result.deidentified_text.unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod annotator;
pub mod audit;
pub mod engine;
pub mod lookup;
pub mod models;
pub mod pipeline;
pub mod processing;
pub mod processors;
pub mod redactor;
pub mod report;
pub mod tokenizer;

// Re-export main types
pub use engine::{check_consistency, BatchItem, DeidEngine};
pub use models::{Annotation, AnnotationSet, DeidentifiedDocument, Document, Tag};
pub use pipeline::{Pipeline, Position, Selection};
pub use processors::{Processor, ProcessorKind};
pub use report::BatchReport;
pub use tokenizer::{TokenList, Tokenizer};
