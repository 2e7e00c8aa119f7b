//! Audit logging module
//!
//! Provides an append-only audit trail of de-identification calls. Entries
//! hold hashes of annotated text, never the text itself.

pub mod logger;

pub use logger::AuditLogger;
