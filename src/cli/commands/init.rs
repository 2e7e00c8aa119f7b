//! Init command implementation
//!
//! This module implements the `init` command for generating a starting
//! configuration file.

use crate::config::BASE_CONFIG;
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "deid.toml")]
    pub output: String,

    /// Write the complete built-in configuration instead of a minimal one
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing deid configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let config_content = if self.with_examples {
            BASE_CONFIG.to_string()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Point [lookups.*] path entries at your vocabulary lists");
                println!(
                    "  3. Validate configuration: deid --config {} validate-config",
                    self.output
                );
                println!(
                    "  4. Run: deid --config {} deidentify notes.txt",
                    self.output
                );
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# deid configuration
# Processors run top to bottom.

[application]
log_level = "info"

[logging]
local_enabled = false
local_path = "./logs"
local_rotation = "daily"

[tokenizer]
merge_terms = ["van der", "van den", "van de"]

[audit]
enabled = false
log_path = "./audit/deid_audit.log"
# hash_key = "${DEID_AUDIT_HASH_KEY}"

[lookups.first_names]
structure = "trie"
path = "lists/first_names.txt"

[[processors]]
name = "patient_names"
kind = "patient_name"
group = "names"

[[processors]]
name = "first_names"
kind = "multi_token_lookup"
group = "names"
args = { lookup = "first_names", tag = "voornaam" }

[[processors]]
name = "person_converter"
kind = "person_converter"
group = "names"

[[processors]]
name = "date_numeric"
kind = "regexp"
group = "dates"
args = { pattern = '(?<!\d)(?:[1-9]|0[1-9]|[12][0-9]|3[01])[- /.](?:0[1-9]|1[012]|[1-9])(?:[- /.]{0,2}(?:\d{4}|\d{2}))?(?!\d)', tag = "datum" }

[[processors]]
name = "bsn"
kind = "checksum"
group = "identifiers"
args = { pattern = '(?<!\d)\d{9}(?!\d)', tag = "bsn" }

[[processors]]
name = "overlap_resolver"
kind = "overlap_resolver"
group = "post_processing"

[[processors]]
name = "merge_adjacent"
kind = "merge_adjacent"
group = "post_processing"

[[processors]]
name = "redactor"
kind = "redactor"
group = "post_processing"
args = { canonical_tags = ["patient"] }
"#
        .to_string()
    }
}
