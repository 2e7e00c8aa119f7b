//! Deidentify command implementation
//!
//! Reads one text from a file or stdin and writes the redacted text, or the
//! full result as JSON, to a file or stdout.

use super::PatientArgs;
use crate::cli::{exit_code_for, SelectionArgs, EXIT_INPUT};
use crate::config::DeidConfig;
use crate::deidentification::{DeidEngine, DeidentifiedDocument};
use anyhow::Context;
use clap::Args;
use std::io::{Read, Write};
use std::path::PathBuf;

/// Arguments for the deidentify command
#[derive(Args, Debug)]
pub struct DeidentifyArgs {
    /// Input file; reads stdin when omitted or "-"
    pub input: Option<PathBuf>,

    /// Output file; writes stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the full result (annotations, warnings, counts) as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub patient: PatientArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

impl DeidentifyArgs {
    /// Execute the deidentify command
    pub async fn execute(&self, config: DeidConfig) -> anyhow::Result<i32> {
        let engine = match DeidEngine::new(config) {
            Ok(engine) => engine,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build de-identification engine");
                eprintln!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let bytes = match self.read_input() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input");
                eprintln!("❌ {e:#}");
                return Ok(EXIT_INPUT);
            }
        };

        let person = self.patient.person();
        let selection = self.selection.selection();

        let result = match engine.deidentify_bytes(&bytes, person.as_ref(), &selection) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "De-identification failed");
                eprintln!("❌ {e}");
                return Ok(exit_code_for(&e));
            }
        };

        for warning in &result.warnings {
            eprintln!("⚠️  {warning}");
        }

        let rendered = if self.json {
            let mut json = serde_json::to_string_pretty(&result)
                .context("Failed to serialize result")?;
            json.push('\n');
            json
        } else {
            render_text(&result)
        };

        match &self.output {
            Some(path) => std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write output: {}", path.display()))?,
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(rendered.as_bytes())
                    .context("Failed to write to stdout")?;
                stdout.flush().context("Failed to flush stdout")?;
            }
        }

        tracing::info!(
            annotations = result.total_annotations(),
            warnings = result.warnings.len(),
            processing_time_ms = result.processing_time_ms,
            "Document de-identified"
        );

        Ok(0)
    }

    fn read_input(&self) -> anyhow::Result<Vec<u8>> {
        match self.input.as_deref() {
            Some(path) if path.as_os_str() != "-" => std::fs::read(path)
                .with_context(|| format!("Failed to read input file: {}", path.display())),
            _ => {
                let mut buffer = Vec::new();
                std::io::stdin()
                    .read_to_end(&mut buffer)
                    .context("Failed to read stdin")?;
                Ok(buffer)
            }
        }
    }
}

/// Redacted text, or one tab-separated annotation per line when the redactor
/// did not run
fn render_text(result: &DeidentifiedDocument) -> String {
    if let Some(text) = &result.deidentified_text {
        return text.clone();
    }

    result
        .annotations
        .iter()
        .map(|a| format!("{}\t{}\t{}\t{}\n", a.start_char, a.end_char, a.tag, a.text))
        .collect()
}
