// deid - Rule-based de-identification of clinical text
// Copyright (c) 2025 Deid Contributors
// Licensed under the MIT License

//! # deid - Rule-based de-identification of clinical text
//!
//! deid finds protected health information (PHI) in free-form Dutch clinical
//! notes and replaces it with category placeholders such as `<PERSOON-1>`,
//! `<DATUM-2>` or `<PATIENT>`.
//!
//! ## Overview
//!
//! This library provides:
//! - **Tokenizing** text into words, punctuation and newlines with byte offsets
//! - **Annotating** names, locations, institutions, dates, ages, identifiers,
//!   phone numbers, e-mail addresses and URLs
//! - **Resolving** overlapping and adjacent annotations
//! - **Redacting** annotated spans, with one shared placeholder for every
//!   mention of the patient
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`deidentification`] - Tokenizer, lookups, processors, pipeline and engine
//! - [`domain`] - Error types and patient metadata
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deid::deidentification::{DeidEngine, Selection};
//! use deid::domain::Person;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = DeidEngine::from_default_config()?;
//!
//!     let patient = Person::new().with_first_names(["Jan"]).with_surname("Jansen");
//!     let result = engine.deidentify(
//!         "Jan Jansen is op 12 maart opgenomen in Utrecht.",
//!         Some(&patient),
//!         &Selection::All,
//!     )?;
//!
//!     println!("{}", result.deidentified_text.unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Selecting processors
//!
//! Every call chooses which processors run, without changing the engine.
//! A processor inside a group runs under [`Selection::Enabled`] only when
//! both the group and the processor are listed:
//!
//! ```rust,no_run
//! use deid::deidentification::{DeidEngine, Selection};
//!
//! # fn example(engine: &DeidEngine) -> deid::domain::Result<()> {
//! // Only dates, then overlap resolution and redaction
//! let selection = Selection::enabled([
//!     "dates", "date_numeric", "date_month_name",
//!     "post_processing", "overlap_resolver", "merge_adjacent", "redactor",
//! ]);
//! let result = engine.deidentify("Gezien op 3-4-2021.", None, &selection)?;
//! # Ok(())
//! # }
//! ```
//!
//! [`Selection::Enabled`]: deidentification::Selection::Enabled
//!
//! ## Error Handling
//!
//! deid uses the [`domain::DeidError`] type for all library errors.
//! Configuration problems surface when an engine is built, never while a
//! document is processed.
//!
//! ## Logging
//!
//! deid logs with the `tracing` crate. Log events carry counts, tags and
//! offsets; document text is never logged.

pub mod cli;
pub mod config;
pub mod deidentification;
pub mod domain;
pub mod logging;
