//! Domain error types
//!
//! This module defines the error hierarchy for deid. Errors are domain-specific
//! and don't expose third-party types.
//!
//! Configuration problems are always raised while building an engine or a
//! pipeline, never while a document is being processed. Matching itself is
//! infallible: an annotator that finds nothing simply returns no annotations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main deid error type
///
/// This is the primary error type used throughout the library.
#[derive(Debug, Error)]
pub enum DeidError {
    /// Unknown processor kind, malformed processor arguments, missing lookup
    /// structures or invalid patterns
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input is not a well-formed text value
    #[error("Input error: {0}")]
    Input(String),

    /// Lookup list loading errors
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl DeidError {
    /// Creates a configuration error for a named processor
    pub fn processor_config(name: &str, message: impl std::fmt::Display) -> Self {
        DeidError::Configuration(format!("processor '{name}': {message}"))
    }
}

/// Non-fatal report of an annotation whose recorded text does not match the
/// source slice at its recorded offsets
///
/// A warning always points at an annotator bug. The offending annotation is
/// still part of the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyWarning {
    /// Tag of the offending annotation
    pub tag: String,

    /// Recorded start offset
    pub start_char: usize,

    /// Recorded end offset
    pub end_char: usize,

    /// Text recorded on the annotation
    pub recorded: String,

    /// Live slice of the source, `None` when the offsets are out of range or
    /// not on a char boundary
    pub found: Option<String>,
}

impl std::fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.found {
            Some(_) => write!(
                f,
                "annotation '{}' at {}..{} does not match source text",
                self.tag, self.start_char, self.end_char
            ),
            None => write!(
                f,
                "annotation '{}' at {}..{} is outside the source text",
                self.tag, self.start_char, self.end_char
            ),
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for DeidError {
    fn from(err: std::io::Error) -> Self {
        DeidError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for DeidError {
    fn from(err: serde_json::Error) -> Self {
        DeidError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for DeidError {
    fn from(err: toml::de::Error) -> Self {
        DeidError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deid_error_display() {
        let err = DeidError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_processor_config_error() {
        let err = DeidError::processor_config("dates", "missing field `tag`");
        assert!(matches!(err, DeidError::Configuration(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: processor 'dates': missing field `tag`"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: DeidError = io_err.into();
        assert!(matches!(err, DeidError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: DeidError = json_err.into();
        assert!(matches!(err, DeidError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: DeidError = toml_err.into();
        assert!(matches!(err, DeidError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_consistency_warning_display() {
        let warning = ConsistencyWarning {
            tag: "datum".to_string(),
            start_char: 4,
            end_char: 9,
            recorded: "1 mei".to_string(),
            found: None,
        };
        assert!(warning.to_string().contains("outside the source text"));
    }

    #[test]
    fn test_deid_error_implements_std_error() {
        let err = DeidError::Input("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
