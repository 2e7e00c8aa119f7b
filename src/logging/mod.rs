//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Human-readable console output on stderr
//! - Configurable log levels
//! - JSON file logging with rotation
//!
//! Log events carry counts, tags and offsets only. Source text and annotation
//! text never appear in a log line.
//!
//! # Example
//!
//! ```no_run
//! use deid::logging::init_logging;
//! use deid::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! tracing::error!(error = "Something went wrong", "Error occurred");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log the start of a de-identification call
///
/// # Example
///
/// ```no_run
/// use deid::log_deidentify_start;
///
/// let text = "Jan Jansen is hier.";
/// log_deidentify_start!(text.len(), 12);
/// ```
#[macro_export]
macro_rules! log_deidentify_start {
    ($text_len:expr, $processors:expr) => {
        tracing::debug!(
            text_len = $text_len,
            processors = $processors,
            "Starting de-identification"
        );
    };
}

/// Log the completion of a de-identification call
///
/// # Example
///
/// ```no_run
/// use deid::log_deidentify_complete;
/// use std::time::Duration;
///
/// log_deidentify_complete!(7, Duration::from_millis(3));
/// ```
#[macro_export]
macro_rules! log_deidentify_complete {
    ($annotations:expr, $duration:expr) => {
        tracing::debug!(
            annotations = $annotations,
            duration_ms = $duration.as_millis() as u64,
            "De-identification completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use deid::log_error_with_context;
/// use deid::domain::DeidError;
///
/// let error = DeidError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log batch progress
///
/// # Example
///
/// ```no_run
/// use deid::log_batch_progress;
///
/// log_batch_progress!(10, 250);
/// ```
#[macro_export]
macro_rules! log_batch_progress {
    ($current:expr, $total:expr) => {
        tracing::debug!(
            current = $current,
            total = $total,
            progress_pct = ($current as f64 / $total as f64 * 100.0),
            "Processing batch"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::DeidError;
    use std::time::Duration;

    #[test]
    fn test_macros_expand_without_subscriber() {
        log_deidentify_start!(19usize, 3usize);
        log_deidentify_complete!(2usize, Duration::from_millis(5));
        log_error_with_context!(DeidError::Input("bad".to_string()), "reading input");
        log_batch_progress!(1usize, 4usize);
    }
}
