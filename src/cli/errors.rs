//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status.

use std::io;

use thiserror::Error;

use crate::captcha::CaptchaError;
use crate::config::ConfigError;
use crate::observability::LoggingError;
use crate::service::ServiceError;
use crate::store::StoreError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("captcha setup failed: {0}")]
    Captcha(#[from] CaptchaError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("boot failed: {0}")]
    BootFailed(String),
}

impl CliError {
    pub fn boot_failed(msg: impl Into<String>) -> Self {
        CliError::BootFailed(msg.into())
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        match self {
            CliError::Config(e) => e.code(),
            CliError::Logging(_) => "COMMENTS_CLI_LOGGING",
            CliError::Store(e) => e.code(),
            CliError::Service(e) => e.code(),
            CliError::Captcha(e) => e.code(),
            CliError::Io(_) => "COMMENTS_CLI_IO_ERROR",
            CliError::Json(_) => "COMMENTS_CLI_JSON_ERROR",
            CliError::BootFailed(_) => "COMMENTS_CLI_BOOT_FAILED",
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_pass_through() {
        let err: CliError = StoreError::corruption_at_offset(3, "bad crc").into();
        assert_eq!(err.code_str(), "COMMENTS_STORE_CORRUPTION");

        let err = CliError::boot_failed("no runtime");
        assert_eq!(err.code_str(), "COMMENTS_CLI_BOOT_FAILED");
        assert!(err.to_string().contains("no runtime"));
    }
}
