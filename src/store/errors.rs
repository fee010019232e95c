//! Comment store error types
//!
//! Error codes:
//! - COMMENTS_INVALID_DOCUMENT_ID / COMMENTS_INVALID_DATE (from the key codec)
//! - COMMENTS_STORE_WRITE_FAILED (ERROR severity)
//! - COMMENTS_STORE_READ_FAILED (ERROR severity)
//! - COMMENTS_STORE_SERIALIZATION (ERROR severity)
//! - COMMENTS_STORE_CORRUPTION (FATAL severity)

use std::fmt;
use std::io;

use thiserror::Error;

use crate::keys::KeyError;

/// Severity of a store error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, server continues
    Error,
    /// The log cannot be trusted; the process must not keep serving it
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error with enough context to locate the failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key could not be built (bad document id or date)
    #[error(transparent)]
    InvalidKey(#[from] KeyError),

    /// Appending to or syncing the log failed
    #[error("write failed: {message}")]
    WriteFailure {
        message: String,
        #[source]
        source: io::Error,
    },

    /// Reading the log failed for a reason other than corruption
    #[error("read failed: {message}")]
    ReadFailure {
        message: String,
        #[source]
        source: io::Error,
    },

    /// A stored value could not be (de)serialized
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Checksum mismatch, truncated record or impossible length
    #[error("log corrupted at byte_offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },
}

impl StoreError {
    pub fn write_failure(message: impl Into<String>, source: io::Error) -> Self {
        StoreError::WriteFailure {
            message: message.into(),
            source,
        }
    }

    pub fn read_failure(message: impl Into<String>, source: io::Error) -> Self {
        StoreError::ReadFailure {
            message: message.into(),
            source,
        }
    }

    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        StoreError::Corruption {
            offset,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidKey(e) => e.code(),
            StoreError::WriteFailure { .. } => "COMMENTS_STORE_WRITE_FAILED",
            StoreError::ReadFailure { .. } => "COMMENTS_STORE_READ_FAILED",
            StoreError::Serialization(_) => "COMMENTS_STORE_SERIALIZATION",
            StoreError::Corruption { .. } => "COMMENTS_STORE_CORRUPTION",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            StoreError::Corruption { .. } => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    /// Returns whether this error is fatal (the log must not be served)
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::InvalidKey(e) => e.status_code(),
            _ => 500,
        }
    }
}
