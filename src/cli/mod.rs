//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for deid using clap.
//!
//! Exit codes: `0` success, `2` configuration error, `3` input error,
//! `5` fatal error.

pub mod commands;

use crate::config::{load_config, load_default_config, DeidConfig, LoggingConfig};
use crate::deidentification::Selection;
use crate::domain::{DeidError, Result};
use clap::{Parser, Subcommand};

/// Exit code for configuration errors
pub const EXIT_CONFIGURATION: i32 = 2;
/// Exit code for malformed input
pub const EXIT_INPUT: i32 = 3;
/// Exit code for everything else
pub const EXIT_FATAL: i32 = 5;

/// deid - rule-based de-identification of clinical text
#[derive(Parser, Debug)]
#[command(name = "deid")]
#[command(version, about, long_about = None)]
#[command(author = "Deid Contributors")]
pub struct Cli {
    /// Path to configuration file (built-in configuration when omitted)
    #[arg(short, long, env = "DEID_CONFIG")]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "DEID_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// De-identify one text from a file or stdin
    Deidentify(commands::deidentify::DeidentifyArgs),

    /// De-identify every text file in a directory
    Batch(commands::batch::BatchArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

impl Cli {
    /// Loads the configuration named by `--config`, or the built-in one
    ///
    /// # Errors
    ///
    /// Returns `DeidError::Configuration` when loading or validation fails.
    pub fn load_config(&self) -> Result<DeidConfig> {
        match &self.config {
            Some(path) => load_config(path),
            None => load_default_config(),
        }
    }

    /// Log level and logging section used to initialize logging
    ///
    /// `--log-level` wins over the configuration file. A configuration that
    /// fails to load falls back to console defaults; the command reports the
    /// failure itself.
    pub fn logging_settings(&self) -> (String, LoggingConfig) {
        let config = match self.command {
            Commands::Init(_) => None,
            _ => self.load_config().ok(),
        };

        let level = self
            .log_level
            .clone()
            .or_else(|| config.as_ref().map(|c| c.application.log_level.clone()))
            .unwrap_or_else(|| "info".to_string());

        (level, config.map(|c| c.logging).unwrap_or_default())
    }
}

/// Processor selection shared by the processing commands
#[derive(clap::Args, Debug, Default, Clone)]
pub struct SelectionArgs {
    /// Run only these processors and groups (comma-separated). A grouped
    /// processor runs only when its group is listed too.
    #[arg(long, value_delimiter = ',', conflicts_with = "disable")]
    pub enable: Vec<String>,

    /// Skip these processors and groups (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub disable: Vec<String>,
}

impl SelectionArgs {
    pub fn selection(&self) -> Selection {
        if !self.enable.is_empty() {
            Selection::enabled(self.enable.iter().cloned())
        } else if !self.disable.is_empty() {
            Selection::disabled(self.disable.iter().cloned())
        } else {
            Selection::All
        }
    }
}

/// Maps an error to the process exit code
pub fn exit_code_for(error: &DeidError) -> i32 {
    match error {
        DeidError::Configuration(_) | DeidError::Lookup(_) => EXIT_CONFIGURATION,
        DeidError::Input(_) => EXIT_INPUT,
        DeidError::Serialization(_) | DeidError::Io(_) | DeidError::Other(_) => EXIT_FATAL,
    }
}
