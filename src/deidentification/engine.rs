//! Main de-identification engine
//!
//! This module provides the [`DeidEngine`] that owns everything a call needs:
//! the tokenizer, the compiled [`Pipeline`], the versioned lookup store and the
//! optional audit logger.
//!
//! # Architecture
//!
//! Each call to [`DeidEngine::deidentify`]:
//! - takes the current lookup snapshot
//! - tokenizes the text and wraps it in a per-call [`Document`]
//! - runs the selected processors in pipeline order
//! - drops pseudo annotations and checks every remaining annotation against
//!   the source
//! - writes an audit entry when auditing is enabled
//!
//! The engine is `Send + Sync`; share it behind an `Arc` to process documents
//! on several threads. Lookup updates publish a new snapshot and never touch
//! one that a running call holds.
//!
//! # Examples
//!
//! ```no_run
//! use deid::deidentification::{DeidEngine, Selection};
//! use deid::domain::Person;
//!
//! # fn example() -> deid::domain::Result<()> {
//! let engine = DeidEngine::from_default_config()?;
//! let patient = Person::new().with_first_names(["Jan"]).with_surname("Jansen");
//!
//! let result = engine.deidentify(
//!     "Jan Jansen is hier. Jansen kwam terug.",
//!     Some(&patient),
//!     &Selection::All,
//! )?;
//! assert_eq!(
//!     result.deidentified_text.as_deref(),
//!     Some("<PATIENT> is hier. <PATIENT> kwam terug.")
//! );
//! # Ok(())
//! # }
//! ```

use crate::config::{load_default_config, DeidConfig};
use crate::deidentification::{
    audit::AuditLogger,
    lookup::{build_registry, LookupRegistry, LookupStore},
    models::{Annotation, DeidentifiedDocument, Document},
    pipeline::{Pipeline, Selection},
    processors::BuildContext,
    report::BatchReport,
    tokenizer::Tokenizer,
};
use crate::domain::{ConsistencyWarning, DeidError, Person, Result};
use crate::{log_deidentify_complete, log_deidentify_start, log_error_with_context};
use secrecy::ExposeSecret;
use std::time::Instant;

/// One document of a batch
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Name used in the report, e.g. a file name
    pub name: String,
    pub text: String,
    pub person: Option<Person>,
}

impl BatchItem {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            person: None,
        }
    }

    pub fn with_person(mut self, person: Person) -> Self {
        self.person = Some(person);
        self
    }
}

/// Main de-identification engine
///
/// Built once from a [`DeidConfig`]; every configuration problem surfaces
/// here, never while a document is processed.
#[derive(Debug)]
pub struct DeidEngine {
    config: DeidConfig,
    tokenizer: Tokenizer,
    pipeline: Pipeline,
    lookups: LookupStore,
    audit_logger: Option<AuditLogger>,
}

impl DeidEngine {
    /// Create a new engine
    ///
    /// Builds the tokenizer, the lookup structures and every configured
    /// processor, then checks that each lookup a processor reads exists with
    /// the right structure.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - A lookup list cannot be read
    /// - A processor has an unknown kind, malformed arguments or an invalid
    ///   pattern
    /// - A required lookup structure is missing
    /// - Audit logger initialization fails
    pub fn new(config: DeidConfig) -> Result<Self> {
        config.validate().map_err(|e| {
            DeidError::Configuration(format!("Configuration validation failed: {e}"))
        })?;

        let tokenizer = Tokenizer::with_merge_terms(&config.tokenizer.merge_terms);
        let registry = build_registry(&config.lookups, config.base_dir.as_deref(), &tokenizer)?;

        let pipeline = {
            let ctx = BuildContext {
                lookups: &registry,
                tokenizer: &tokenizer,
                recall_boost: config.pipeline.recall_boost,
            };
            Pipeline::from_specs(&config.processors, &ctx)?
        };

        let lookups = LookupStore::new(registry, pipeline.required_lookups())?;

        let audit_logger = if config.audit.enabled {
            let mut logger =
                AuditLogger::new(config.audit.log_path.clone(), config.audit.json_format, true)?;
            if let Some(key) = &config.audit.hash_key {
                logger = logger.with_hash_key(key.expose_secret().as_ref().as_bytes());
            }
            Some(logger)
        } else {
            None
        };

        tracing::info!(
            processors = pipeline.len(),
            lookups = lookups.snapshot().registry().len(),
            audit = audit_logger.is_some(),
            "De-identification engine ready"
        );

        Ok(Self {
            config,
            tokenizer,
            pipeline,
            lookups,
            audit_logger,
        })
    }

    /// Create an engine from the built-in configuration
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn from_default_config() -> Result<Self> {
        Self::new(load_default_config()?)
    }

    /// De-identify one text
    ///
    /// Runs the processors chosen by `selection`. The result holds the
    /// final annotations in `start_char` order, the redacted text when the
    /// redactor took part, and a [`ConsistencyWarning`] for every annotation
    /// whose recorded text differs from the source at its offsets.
    ///
    /// # Errors
    ///
    /// Returns `DeidError::Io` only when the audit entry cannot be written.
    pub fn deidentify(
        &self,
        text: &str,
        person: Option<&Person>,
        selection: &Selection,
    ) -> Result<DeidentifiedDocument> {
        let start = Instant::now();
        log_deidentify_start!(text.len(), self.pipeline.selected(selection).len());

        let snapshot = self.lookups.snapshot();
        let tokens = self.tokenizer.tokenize(text);
        let mut doc = Document::new(text, tokens, person, snapshot.registry());

        self.pipeline.run(&mut doc, selection);

        let (annotations, redacted) = doc.into_output();
        let annotations: Vec<Annotation> = annotations
            .into_vec()
            .into_iter()
            .filter(|a| !a.tag.is_pseudo())
            .collect();

        let warnings = check_consistency(text, &annotations);
        for warning in &warnings {
            tracing::warn!(
                tag = %warning.tag,
                start_char = warning.start_char,
                end_char = warning.end_char,
                "Annotation text does not match source"
            );
        }

        let elapsed = start.elapsed();
        log_deidentify_complete!(annotations.len(), elapsed);

        let result = DeidentifiedDocument::new(
            annotations,
            redacted,
            warnings,
            elapsed.as_millis() as u64,
        );

        if let Some(ref logger) = self.audit_logger {
            logger.log_deidentification(&result)?;
        }

        Ok(result)
    }

    /// De-identify raw bytes
    ///
    /// # Errors
    ///
    /// Returns `DeidError::Input` when `bytes` is not valid UTF-8; nothing is
    /// processed in that case.
    pub fn deidentify_bytes(
        &self,
        bytes: &[u8],
        person: Option<&Person>,
        selection: &Selection,
    ) -> Result<DeidentifiedDocument> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| DeidError::Input(format!("input is not valid UTF-8: {e}")))?;
        self.deidentify(text, person, selection)
    }

    /// De-identify a batch of documents in order
    ///
    /// A failing document is logged, recorded in the report and left out of
    /// the results; the remaining documents are still processed.
    pub fn deidentify_batch(
        &self,
        items: Vec<BatchItem>,
        selection: &Selection,
    ) -> (Vec<DeidentifiedDocument>, BatchReport) {
        let mut results = Vec::with_capacity(items.len());
        let mut report = BatchReport::new();

        for name in self.pipeline.unknown_names(selection) {
            report.add_warning(format!("'{name}' matches no processor or group"));
        }

        for item in items {
            match self.deidentify(&item.text, item.person.as_ref(), selection) {
                Ok(result) => {
                    report.add_document(&item.name, &result);
                    results.push(result);
                }
                Err(e) => {
                    log_error_with_context!(&e, "Failed to de-identify document");
                    report.add_failure(&item.name, &e);
                }
            }
        }

        (results, report)
    }

    /// Copy the active lookups, apply `update` and publish the result
    ///
    /// Calls already running keep the snapshot they started with. Returns the
    /// new snapshot version.
    ///
    /// # Errors
    ///
    /// Propagates errors from `update`. Returns `DeidError::Configuration`
    /// when the updated registry lacks a structure a processor needs; the
    /// previous snapshot stays active.
    pub fn update_lookups<F>(&self, update: F) -> Result<u64>
    where
        F: FnOnce(&mut LookupRegistry) -> Result<()>,
    {
        self.lookups.update(update)
    }

    /// Rebuild every lookup from configuration and publish it
    ///
    /// Picks up changes to list files on disk.
    ///
    /// # Errors
    ///
    /// Returns `DeidError::Lookup` if a list cannot be read, or
    /// `DeidError::Configuration` if a required structure is missing.
    pub fn reload_lookups(&self) -> Result<u64> {
        let registry = build_registry(
            &self.config.lookups,
            self.config.base_dir.as_deref(),
            &self.tokenizer,
        )?;
        self.lookups.publish(registry)
    }

    /// Version of the active lookup snapshot
    pub fn lookup_version(&self) -> u64 {
        self.lookups.version()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn config(&self) -> &DeidConfig {
        &self.config
    }

    pub fn is_audit_enabled(&self) -> bool {
        self.audit_logger.is_some()
    }
}

/// Warnings for annotations whose text differs from `source` at their offsets
pub fn check_consistency(source: &str, annotations: &[Annotation]) -> Vec<ConsistencyWarning> {
    annotations
        .iter()
        .filter(|a| !a.is_consistent_with(source))
        .map(|a| ConsistencyWarning {
            tag: a.tag.to_string(),
            start_char: a.start_char,
            end_char: a.end_char,
            recorded: a.text.clone(),
            found: source.get(a.start_char..a.end_char).map(str::to_string),
        })
        .collect()
}
