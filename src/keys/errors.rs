//! Key codec errors

use thiserror::Error;

/// Result type for key encoding and decoding
pub type KeyResult<T> = Result<T, KeyError>;

/// Errors raised while building or parsing storage keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Document id is empty, too long, has a leading zero, or leaves `[A-Za-z0-9]`
    #[error("invalid documentId '{document_id}': {reason}")]
    InvalidDocumentId {
        document_id: String,
        reason: &'static str,
    },

    /// Date is negative or does not fit the fixed date width
    #[error("invalid date {0}: must be in 0..1000000000000000")]
    InvalidDate(i64),

    /// Stored key does not have the `id ++ 0x00 ++ date` shape
    #[error("malformed storage key: {0}")]
    MalformedKey(String),
}

impl KeyError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            KeyError::InvalidDocumentId { .. } => "COMMENTS_INVALID_DOCUMENT_ID",
            KeyError::InvalidDate(_) => "COMMENTS_INVALID_DATE",
            KeyError::MalformedKey(_) => "COMMENTS_MALFORMED_KEY",
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            KeyError::InvalidDocumentId { .. } | KeyError::InvalidDate(_) => 400,
            // A malformed key can only come out of the log itself
            KeyError::MalformedKey(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = KeyError::InvalidDocumentId {
            document_id: "bad id".to_string(),
            reason: "characters outside [A-Za-z0-9]",
        };
        assert_eq!(err.code(), "COMMENTS_INVALID_DOCUMENT_ID");
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("bad id"));

        assert_eq!(KeyError::InvalidDate(-1).code(), "COMMENTS_INVALID_DATE");
        assert_eq!(KeyError::MalformedKey("x".into()).status_code(), 500);
    }
}
