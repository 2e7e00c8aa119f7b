//! Batch command implementation
//!
//! De-identifies every matching file in a directory. Documents run
//! concurrently on blocking tasks sharing one engine; each redacted text is
//! written under the same file name in the output directory, and a JSON
//! report is written next to them.

use super::PatientArgs;
use crate::cli::{exit_code_for, SelectionArgs, EXIT_CONFIGURATION, EXIT_FATAL, EXIT_INPUT};
use crate::config::DeidConfig;
use crate::deidentification::{BatchReport, DeidEngine, DeidentifiedDocument, Selection};
use crate::domain::{DeidError, Person};
use crate::log_batch_progress;
use anyhow::Context;
use clap::Args;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

const REPORT_FILE: &str = "deid_report.json";

/// Arguments for the batch command
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Directory with input documents
    pub input_dir: PathBuf,

    /// Directory for redacted documents (created if missing)
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Only process files with this extension
    #[arg(long, default_value = "txt")]
    pub extension: String,

    /// Number of documents processed at the same time
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// JSON file mapping input file names to patient metadata
    #[arg(long, value_name = "FILE")]
    pub patients: Option<PathBuf>,

    /// Report path (defaults to deid_report.json in the output directory)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Patient metadata applied to files without an entry in --patients
    #[command(flatten)]
    pub patient: PatientArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Outcome of one file
struct FileOutcome {
    name: String,
    result: Result<DeidentifiedDocument, DeidError>,
}

impl BatchArgs {
    /// Execute the batch command
    pub async fn execute(&self, config: DeidConfig) -> anyhow::Result<i32> {
        tracing::info!(input_dir = %self.input_dir.display(), "Starting batch command");

        if self.concurrency == 0 {
            eprintln!("❌ --concurrency must be at least 1");
            return Ok(EXIT_CONFIGURATION);
        }

        if same_directory(&self.input_dir, &self.output_dir) {
            tracing::error!(
                output_dir = %self.output_dir.display(),
                "Output directory is the input directory"
            );
            eprintln!(
                "❌ --output-dir must differ from the input directory ({}); inputs would be overwritten",
                self.input_dir.display()
            );
            return Ok(EXIT_CONFIGURATION);
        }

        let engine = match DeidEngine::new(config) {
            Ok(engine) => Arc::new(engine),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build de-identification engine");
                eprintln!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let patients = match &self.patients {
            Some(path) => match load_patients(path) {
                Ok(patients) => patients,
                Err(e) => {
                    eprintln!("❌ {e}");
                    return Ok(exit_code_for(&e));
                }
            },
            None => HashMap::new(),
        };

        let files = match list_inputs(&self.input_dir, &self.extension) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                self.output_dir.display()
            )
        })?;

        println!(
            "🔒 De-identifying {} documents from {}",
            files.len(),
            self.input_dir.display()
        );

        let selection = self.selection.selection();
        let default_person = self.patient.person();
        let outcomes = self
            .process_files(engine.clone(), files, &patients, default_person, selection.clone())
            .await;

        let mut report = BatchReport::new();
        for name in engine.pipeline().unknown_names(&selection) {
            report.add_warning(format!("'{name}' matches no processor or group"));
        }

        let mut exit_code = 0;
        for outcome in outcomes {
            match outcome.result {
                Ok(result) => report.add_document(outcome.name, &result),
                Err(e) => {
                    exit_code = exit_code.max(match exit_code_for(&e) {
                        EXIT_INPUT => EXIT_INPUT,
                        _ => EXIT_FATAL,
                    });
                    report.add_failure(outcome.name, e);
                }
            }
        }

        let report_path = self
            .report
            .clone()
            .unwrap_or_else(|| self.output_dir.join(REPORT_FILE));
        report
            .write_to_file(&report_path)
            .with_context(|| format!("Failed to write report: {}", report_path.display()))?;

        println!("{}", report.format_console());
        println!("📄 Report written to {}", report_path.display());

        tracing::info!(
            documents = report.total_documents,
            failed = report.failures.len(),
            annotations = report.total_annotations,
            "Batch completed"
        );

        Ok(exit_code)
    }

    async fn process_files(
        &self,
        engine: Arc<DeidEngine>,
        files: Vec<PathBuf>,
        patients: &HashMap<String, Person>,
        default_person: Option<Person>,
        selection: Selection,
    ) -> Vec<FileOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let selection = Arc::new(selection);
        let total = files.len();
        let mut handles = Vec::with_capacity(total);

        for path in files {
            let name = file_name(&path);
            let person = patients.get(&name).cloned().or_else(|| default_person.clone());
            let output = self.output_dir.join(&name);
            let engine = engine.clone();
            let selection = selection.clone();
            let semaphore = semaphore.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let task_name = name.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    process_file(&engine, &path, &output, person.as_ref(), &selection)
                })
                .await;

                let result = joined.unwrap_or_else(|e| {
                    Err(DeidError::Other(format!("worker for {task_name} failed: {e}")))
                });
                FileOutcome { name, result }
            }));
        }

        let mut outcomes = Vec::with_capacity(total);
        for handle in handles {
            match handle.await {
                Ok(outcome) => {
                    if let Err(e) = &outcome.result {
                        tracing::error!(file = %outcome.name, error = %e, "Document failed");
                    }
                    outcomes.push(outcome);
                    log_batch_progress!(outcomes.len(), total);
                }
                Err(e) => tracing::error!(error = %e, "Batch task failed"),
            }
        }

        outcomes.sort_by(|a, b| a.name.cmp(&b.name));
        outcomes
    }
}

fn process_file(
    engine: &DeidEngine,
    input: &Path,
    output: &Path,
    person: Option<&Person>,
    selection: &Selection,
) -> Result<DeidentifiedDocument, DeidError> {
    let bytes = std::fs::read(input)
        .map_err(|e| DeidError::Io(format!("Failed to read {}: {}", input.display(), e)))?;
    let result = engine.deidentify_bytes(&bytes, person, selection)?;

    if let Some(text) = &result.deidentified_text {
        std::fs::write(output, text)
            .map_err(|e| DeidError::Io(format!("Failed to write {}: {}", output.display(), e)))?;
    }

    Ok(result)
}

/// Input files with `extension`, sorted by name
fn list_inputs(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, DeidError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        DeidError::Input(format!("Cannot read input directory {}: {}", dir.display(), e))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads `{ "file.txt": { "first_names": [...], "surname": "..." } }`
fn load_patients(path: &Path) -> Result<HashMap<String, Person>, DeidError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        DeidError::Input(format!("Cannot read patients file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&contents).map_err(|e| {
        DeidError::Input(format!("Invalid patients file {}: {}", path.display(), e))
    })
}

/// True when both paths name the same directory
///
/// Paths that do not exist yet are compared as given.
fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
