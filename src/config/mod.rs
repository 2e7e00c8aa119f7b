//! Configuration management for deid.
//!
//! # Overview
//!
//! deid uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `DEID_*` environment overrides
//! - Default values for optional settings
//! - Validation before any processor is built
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use deid::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("deid.toml")?;
//! for processor in &config.processors {
//!     println!("{} ({})", processor.name, processor.kind);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level
//! - [`LoggingConfig`] - JSON file logging
//! - [`PipelineConfig`] - pipeline-wide switches such as recall boost
//! - [`TokenizerConfig`] - multi-word merge terms
//! - [`AuditConfig`] - audit trail
//! - [`LookupConfig`] - one `[lookups.<name>]` structure
//! - [`ProcessorSpec`] - one `[[processors]]` entry
//!
//! # Example Configuration
//!
//! ```toml
//! [tokenizer]
//! merge_terms = ["van der", "van den"]
//!
//! [lookups.first_names]
//! structure = "trie"
//! path = "lists/first_names"
//!
//! [[processors]]
//! name = "first_names"
//! kind = "multi_token_lookup"
//! group = "names"
//! args = { lookup = "first_names", tag = "voornaam" }
//!
//! [[processors]]
//! name = "redactor"
//! kind = "redactor"
//! group = "post_processing"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, load_default_config, parse_config, BASE_CONFIG};
pub use schema::{
    ApplicationConfig, AuditConfig, DeidConfig, LoggingConfig, LookupConfig, PipelineConfig,
    ProcessorSpec, TokenizerConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
