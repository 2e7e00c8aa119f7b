//! Validate config command implementation
//!
//! This module implements the `validate-config` command. Beyond parsing, it
//! builds every processor and lookup structure, so a configuration that
//! passes here also builds an engine.

use crate::cli::{exit_code_for, Cli};
use crate::deidentification::DeidEngine;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Also list every processor with its kind and group
    #[arg(long)]
    pub verbose: bool,
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        let source = cli.config.as_deref().unwrap_or("<built-in>");
        tracing::info!(config_path = %source, "Validating configuration");

        println!("🔍 Validating configuration: {source}");
        println!();

        let config = match cli.load_config() {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let summary = config.clone();
        match DeidEngine::new(config) {
            Ok(engine) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Log Level: {}", summary.application.log_level);
                println!("  Recall Boost: {}", summary.pipeline.recall_boost);
                println!("  Merge Terms: {}", summary.tokenizer.merge_terms.len());
                println!("  Lookups: {}", summary.lookups.len());
                println!("  Processors: {}", engine.pipeline().len());
                println!("  Groups: {}", engine.pipeline().groups().join(", "));
                println!("  Audit: {}", summary.audit.enabled);

                if self.verbose {
                    println!();
                    println!("Processors:");
                    for spec in &summary.processors {
                        println!(
                            "  {:30} {:20} {}",
                            spec.name,
                            spec.kind.as_str(),
                            spec.group.as_deref().unwrap_or("-")
                        );
                    }
                }
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(exit_code_for(&e))
            }
        }
    }
}
