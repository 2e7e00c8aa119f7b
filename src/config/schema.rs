//! Configuration schema types
//!
//! One TOML file describes a complete de-identification setup: the lookup
//! structures, the ordered processors and the ambient settings around them.

use crate::config::SecretString;
use crate::deidentification::lookup::StructureKind;
use crate::deidentification::processors::ProcessorKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Main deid configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeidConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Pipeline-wide switches
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Tokenizer settings
    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    /// Audit trail settings
    #[serde(default)]
    pub audit: AuditConfig,

    /// Lookup structures by name
    #[serde(default)]
    pub lookups: BTreeMap<String, LookupConfig>,

    /// Processors in pipeline order
    #[serde(default)]
    pub processors: Vec<ProcessorSpec>,

    /// Directory relative lookup paths are resolved against; set by the
    /// loader to the directory of the configuration file
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl DeidConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.logging.validate()?;
        self.audit.validate()?;

        for (name, lookup) in &self.lookups {
            lookup
                .validate()
                .map_err(|e| format!("lookups.{name}: {e}"))?;
        }

        if self.processors.is_empty() {
            return Err("at least one [[processors]] entry is required".to_string());
        }

        let mut names = HashSet::new();
        for spec in &self.processors {
            spec.validate()?;
            if !names.insert(spec.name.as_str()) {
                return Err(format!("processor name '{}' is used more than once", spec.name));
            }
        }

        // A group and a processor sharing a name would make selections ambiguous
        for spec in &self.processors {
            if let Some(group) = &spec.group {
                if names.contains(group.as_str()) {
                    return Err(format!("group '{group}' has the same name as a processor"));
                }
            }
        }

        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path must not be empty".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

/// Pipeline-wide switches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Lets lookup annotators also match lowercase spellings of capitalized
    /// phrases, using each annotator's `recall_boost` settings
    #[serde(default)]
    pub recall_boost: bool,
}

/// Tokenizer settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Multi-word terms kept together as one token, e.g. `"van der"`
    #[serde(default)]
    pub merge_terms: Vec<String>,
}

/// Audit trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit logging
    #[serde(default)]
    pub enabled: bool,

    /// Audit log file path
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,

    /// Use JSON format for audit logs
    #[serde(default = "default_true")]
    pub json_format: bool,

    /// Per-deployment secret keying the annotation text hashes
    /// Stored securely in memory and never serialized
    #[serde(default, skip_serializing)]
    pub hash_key: Option<SecretString>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: default_audit_log_path(),
            json_format: true,
            hash_key: None,
        }
    }
}

impl AuditConfig {
    fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        if self.log_path.as_os_str().is_empty() {
            return Err("audit.log_path must be set when audit logging is enabled".to_string());
        }
        use secrecy::ExposeSecret;

        if self
            .hash_key
            .as_ref()
            .map_or(true, |key| key.expose_secret().is_blank())
        {
            return Err("audit.hash_key must be set when audit logging is enabled".to_string());
        }
        Ok(())
    }
}

/// One lookup structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupConfig {
    /// `set` for single tokens, `trie` for multi-token phrases
    pub structure: StructureKind,

    /// Case-sensitive matching
    #[serde(default = "default_true")]
    pub case_sensitive: bool,

    /// Inline items
    #[serde(default)]
    pub items: Vec<String>,

    /// List file or list directory, relative to the configuration file
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Items removed from the final structure
    #[serde(default)]
    pub exceptions: Vec<String>,
}

impl LookupConfig {
    fn validate(&self) -> Result<(), String> {
        if self.items.is_empty() && self.path.is_none() {
            return Err("either items or path is required".to_string());
        }
        Ok(())
    }
}

/// One `[[processors]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessorSpec {
    /// Unique processor name
    pub name: String,

    /// Processor kind
    pub kind: ProcessorKind,

    /// Optional group, see the pipeline selection rules
    #[serde(default)]
    pub group: Option<String>,

    /// Kind-specific arguments
    #[serde(default)]
    pub args: toml::Table,
}

impl ProcessorSpec {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("processor name must not be empty".to_string());
        }
        if self.group.as_deref().is_some_and(|g| g.trim().is_empty()) {
            return Err(format!("processor '{}' has an empty group", self.name));
        }
        Ok(())
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("./audit/deid_audit.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, group: Option<&str>) -> ProcessorSpec {
        ProcessorSpec {
            name: name.to_string(),
            kind: ProcessorKind::Redactor,
            group: group.map(str::to_string),
            args: toml::Table::new(),
        }
    }

    fn config(processors: Vec<ProcessorSpec>) -> DeidConfig {
        DeidConfig {
            application: ApplicationConfig::default(),
            logging: LoggingConfig::default(),
            pipeline: PipelineConfig::default(),
            tokenizer: TokenizerConfig::default(),
            audit: AuditConfig::default(),
            lookups: BTreeMap::new(),
            processors,
            base_dir: None,
        }
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(!config.local_enabled);
        assert_eq!(config.local_rotation, "daily");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_logging_rotation_validation() {
        let config = LoggingConfig {
            local_rotation: "weekly".to_string(),
            ..LoggingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_processor_names() {
        let config = config(vec![spec("redact", None), spec("redact", None)]);
        let err = config.validate().unwrap_err();
        assert!(err.contains("more than once"));
    }

    #[test]
    fn test_group_may_not_shadow_processor() {
        let config = config(vec![spec("names", None), spec("first_names", Some("names"))]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_processors_required() {
        assert!(config(Vec::new()).validate().is_err());
    }

    #[test]
    fn test_lookup_requires_items_or_path() {
        let lookup: LookupConfig = toml::from_str("structure = \"set\"").unwrap();
        assert!(lookup.case_sensitive);
        assert!(lookup.validate().is_err());
    }

    #[test]
    fn test_processor_spec_parses_args() {
        let spec: ProcessorSpec = toml::from_str(
            r#"
name = "postcodes"
kind = "regexp"
group = "locations"

[args]
pattern = "\\d{4}"
tag = "locatie"
"#,
        )
        .unwrap();

        assert_eq!(spec.kind, ProcessorKind::Regexp);
        assert_eq!(spec.group.as_deref(), Some("locations"));
        assert_eq!(spec.args["tag"].as_str(), Some("locatie"));
    }

    #[test]
    fn test_unknown_processor_kind_is_rejected() {
        let result: Result<ProcessorSpec, _> = toml::from_str("name = \"x\"\nkind = \"neural\"");
        assert!(result.is_err());
    }
}
