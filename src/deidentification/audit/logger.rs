//! Audit logger for de-identification calls

use crate::deidentification::models::{Annotation, DeidentifiedDocument};
use crate::domain::{DeidError, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

const SHA256_BLOCK: usize = 64;
const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// HMAC-SHA256 key normalized to one hash block
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
struct HashKey([u8; SHA256_BLOCK]);

impl HashKey {
    fn new(key: &[u8]) -> Self {
        let mut block = [0u8; SHA256_BLOCK];
        if key.len() > SHA256_BLOCK {
            let digest = Sha256::digest(key);
            block[..digest.len()].copy_from_slice(&digest);
        } else {
            block[..key.len()].copy_from_slice(key);
        }
        Self(block)
    }

    fn padded(&self, pad: u8) -> [u8; SHA256_BLOCK] {
        let mut out = self.0;
        for byte in &mut out {
            *byte ^= pad;
        }
        out
    }

    /// HMAC-SHA256 (RFC 2104) of `data` as lowercase hex
    fn mac_hex(&self, data: &[u8]) -> String {
        let inner = Sha256::new()
            .chain_update(self.padded(IPAD))
            .chain_update(data)
            .finalize();
        let outer = Sha256::new()
            .chain_update(self.padded(OPAD))
            .chain_update(inner)
            .finalize();
        format!("{outer:x}")
    }
}

impl fmt::Debug for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashKey(..)")
    }
}

/// Audit log entry
#[derive(Debug, Serialize)]
struct AuditLogEntry {
    timestamp: String,
    document_id: String,
    annotations_count: usize,
    warnings_count: usize,
    redacted: bool,
    processing_time_ms: u64,
    annotations: Vec<AuditAnnotation>,
}

/// Audit annotation entry (with hashed text)
#[derive(Debug, Serialize)]
struct AuditAnnotation {
    tag: String,
    start_char: usize,
    end_char: usize,
    /// Keyed HMAC-SHA256 of the annotated text (never log plaintext PHI)
    text_hash: String,
}

/// Audit logger for de-identification calls
///
/// Writes one line per document, as JSON or as plain text. Annotation text is
/// recorded only as an HMAC-SHA256 keyed with the deployment's hash key, so
/// common names cannot be recovered from the log by hashing a dictionary.
#[derive(Debug)]
pub struct AuditLogger {
    log_path: PathBuf,
    json_format: bool,
    enabled: bool,
    hash_key: HashKey,
}

impl AuditLogger {
    /// Create a new audit logger
    ///
    /// # Errors
    ///
    /// Returns `DeidError::Io` if the parent directory cannot be created.
    pub fn new(log_path: PathBuf, json_format: bool, enabled: bool) -> Result<Self> {
        if enabled {
            if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DeidError::Io(format!(
                        "Failed to create audit log directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(Self {
            log_path,
            json_format,
            enabled,
            hash_key: HashKey::new(&[]),
        })
    }

    /// Key the annotation text hashes with a per-deployment secret
    pub fn with_hash_key(mut self, key: &[u8]) -> Self {
        self.hash_key = HashKey::new(key);
        self
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log a de-identified document
    ///
    /// # Errors
    ///
    /// Returns `DeidError::Io` when the log file cannot be written.
    pub fn log_deidentification(&self, document: &DeidentifiedDocument) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = AuditLogEntry {
            timestamp: document.timestamp.to_rfc3339(),
            document_id: document.id.to_string(),
            annotations_count: document.annotations.len(),
            warnings_count: document.warnings.len(),
            redacted: document.deidentified_text.is_some(),
            processing_time_ms: document.processing_time_ms,
            annotations: document
                .annotations
                .iter()
                .map(|a| self.create_audit_annotation(a))
                .collect(),
        };

        self.write_entry(&entry)
    }

    fn create_audit_annotation(&self, annotation: &Annotation) -> AuditAnnotation {
        AuditAnnotation {
            tag: annotation.tag.to_string(),
            start_char: annotation.start_char,
            end_char: annotation.end_char,
            text_hash: self.hash_text(&annotation.text),
        }
    }

    /// Keyed hash of annotated text
    fn hash_text(&self, value: &str) -> String {
        self.hash_key.mac_hex(value.as_bytes())
    }

    fn write_entry(&self, entry: &AuditLogEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| {
                DeidError::Io(format!(
                    "Failed to open audit log {}: {}",
                    self.log_path.display(),
                    e
                ))
            })?;

        if self.json_format {
            let json_line = serde_json::to_string(entry)?;
            writeln!(file, "{json_line}")?;
        } else {
            let mut tags: Vec<&str> = entry.annotations.iter().map(|a| a.tag.as_str()).collect();
            tags.sort_unstable();
            tags.dedup();
            writeln!(
                file,
                "[{}] Document: {} | Annotations: {} | Tags: {} | Redacted: {} | Time: {}ms",
                entry.timestamp,
                entry.document_id,
                entry.annotations_count,
                tags.join(","),
                entry.redacted,
                entry.processing_time_ms
            )?;
        }

        Ok(())
    }
}
