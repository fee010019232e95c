//! Service error taxonomy
//!
//! - Validation: bad input, surfaced, never retried
//! - Store: I/O or corruption below, surfaced, retry is the caller's call
//! - Captcha: submission refused before any store mutation
//! - TaskFailed: the worker running a store call died

use thiserror::Error;

use crate::captcha::CaptchaError;
use crate::keys::KeyError;
use crate::store::StoreError;

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Input rejected before reaching the store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("comment body is required")]
    BodyRequired,

    #[error(transparent)]
    DocumentId(#[from] KeyError),

    /// `inReplyTo` is malformed, points at another document, or at nothing
    #[error("cannot reply to '{0}': no such comment on this document")]
    UnknownParent(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Captcha(#[from] CaptchaError),

    #[error("service task failed: {0}")]
    TaskFailed(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidKey(key_err) => {
                ServiceError::Validation(ValidationError::DocumentId(key_err))
            }
            other => ServiceError::Store(other),
        }
    }
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(ValidationError::BodyRequired) => "COMMENTS_BODY_REQUIRED",
            ServiceError::Validation(ValidationError::DocumentId(e)) => e.code(),
            ServiceError::Validation(ValidationError::UnknownParent(_)) => {
                "COMMENTS_UNKNOWN_PARENT"
            }
            ServiceError::Store(e) => e.code(),
            ServiceError::Captcha(e) => e.code(),
            ServiceError::TaskFailed(_) => "COMMENTS_TASK_FAILED",
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 400,
            ServiceError::Captcha(CaptchaError::Service(_)) => 502,
            ServiceError::Captcha(_) => 403,
            ServiceError::Store(e) => e.status_code(),
            ServiceError::TaskFailed(_) => 500,
        }
    }

    /// Text shown inline next to the comment form. Never leaks internals.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Validation(e) => e.to_string(),
            ServiceError::Captcha(_) => "captcha validation failed".to_string(),
            ServiceError::Store(_) => "database error".to_string(),
            ServiceError::TaskFailed(_) => "server error".to_string(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}
