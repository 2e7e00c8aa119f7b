//! Domain types shared across deid.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Error types** ([`DeidError`], [`ConsistencyWarning`])
//! - **Result type alias** ([`Result`])
//! - **Patient metadata** ([`Person`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, DeidError>`]:
//!
//! ```rust
//! use deid::domain::{DeidError, Result};
//!
//! fn example(text: &[u8]) -> Result<&str> {
//!     std::str::from_utf8(text).map_err(|e| DeidError::Input(e.to_string()))
//! }
//! # assert!(example(b"ok").is_ok());
//! ```

pub mod errors;
pub mod person;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{ConsistencyWarning, DeidError};
pub use person::Person;
pub use result::Result;
