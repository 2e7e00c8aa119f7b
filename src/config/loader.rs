//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::DeidConfig;
use super::secret::secret_string;
use crate::domain::errors::DeidError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Built-in configuration with a small sample vocabulary
pub const BASE_CONFIG: &str = include_str!("../../resources/base_config.toml");

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into DeidConfig
/// 4. Applies environment variable overrides (DEID_* prefix)
/// 5. Validates the configuration
///
/// Relative lookup list paths are resolved against the directory of `path`.
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use deid::config::loader::load_config;
///
/// let config = load_config("deid.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<DeidConfig> {
    let path = path.as_ref();

    // Check if file exists
    if !path.exists() {
        return Err(DeidError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    // Read file contents
    let contents = fs::read_to_string(path).map_err(|e| {
        DeidError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let mut config = parse_config(&contents)?;
    config.base_dir = path.parent().map(Path::to_path_buf);
    Ok(config)
}

/// Loads the built-in configuration
///
/// Environment overrides apply as for [`load_config`].
///
/// # Errors
///
/// Returns an error if an override makes the configuration invalid.
pub fn load_default_config() -> Result<DeidConfig> {
    parse_config(BASE_CONFIG)
}

/// Parses configuration text: substitution, overrides and validation
///
/// # Errors
///
/// Returns `DeidError::Configuration` on any failure.
pub fn parse_config(contents: &str) -> Result<DeidConfig> {
    // Perform environment variable substitution
    let contents = substitute_env_vars(contents)?;

    // Parse TOML
    let mut config: DeidConfig = toml::from_str(&contents)
        .map_err(|e| DeidError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    // Apply environment variable overrides
    apply_env_overrides(&mut config)?;

    // Validate configuration
    config.validate().map_err(|e| {
        DeidError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| DeidError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    // Process line by line to skip comments
    for line in input.lines() {
        let trimmed = line.trim_start();

        // Skip comment lines - don't process env vars in comments
        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(DeidError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    value.parse().map_err(|_| {
        DeidError::Configuration(format!("{name} must be true or false, got '{value}'"))
    })
}

/// Applies environment variable overrides with DEID_ prefix
fn apply_env_overrides(config: &mut DeidConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("DEID_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Pipeline overrides
    if let Ok(val) = std::env::var("DEID_PIPELINE_RECALL_BOOST") {
        config.pipeline.recall_boost = parse_bool("DEID_PIPELINE_RECALL_BOOST", &val)?;
    }

    // Audit overrides
    if let Ok(val) = std::env::var("DEID_AUDIT_ENABLED") {
        config.audit.enabled = parse_bool("DEID_AUDIT_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("DEID_AUDIT_LOG_PATH") {
        config.audit.log_path = val.into();
    }
    if let Ok(val) = std::env::var("DEID_AUDIT_HASH_KEY") {
        config.audit.hash_key = Some(secret_string(val));
    }

    // Logging overrides
    if let Ok(val) = std::env::var("DEID_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_bool("DEID_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("DEID_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("DEID_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[application]
log_level = "debug"

[lookups.places]
structure = "trie"
items = ["Utrecht"]

[[processors]]
name = "places"
kind = "multi_token_lookup"
group = "locations"
args = { lookup = "places", tag = "locatie" }

[[processors]]
name = "redact"
kind = "redactor"
"#;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("DEID_TEST_VAR", "test_value");
        let input = "path = \"${DEID_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "path = \"test_value\"\n");
        std::env::remove_var("DEID_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("DEID_MISSING_VAR");
        let input = "path = \"${DEID_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("DEID_MISSING_VAR"));
    }

    #[test]
    fn test_comments_are_not_substituted() {
        std::env::remove_var("DEID_COMMENTED_VAR");
        let input = "# path = \"${DEID_COMMENTED_VAR}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(matches!(result, Err(DeidError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.processors.len(), 2);
        assert_eq!(config.processors[0].group.as_deref(), Some("locations"));
        assert_eq!(config.base_dir.as_deref(), temp_file.path().parent());
    }

    #[test]
    fn test_invalid_toml() {
        let result = parse_config("[[processors]\nname = ");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML"));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = load_default_config().unwrap();
        assert!(!config.processors.is_empty());
        assert!(config.processors.iter().any(|p| p.name == "redactor"));
    }
}
