//! # Captcha Verification
//!
//! Gate in front of comment submission. Verification happens before any
//! store mutation; a failed captcha means nothing is written.
//!
//! Providers that issue challenges (proof-of-work) hand one out with every
//! comment listing; the client solves it and submits `challenge:nonce`.

mod remote;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use remote::{ProofOfWorkVerifier, RecaptchaVerifier};

/// Timeout for calls to the captcha service
pub const CAPTCHA_TIMEOUT: Duration = Duration::from_secs(20);

/// Captcha failures
#[derive(Debug, Clone, Error)]
pub enum CaptchaError {
    /// No token was submitted
    #[error("captcha token is missing")]
    Missing,

    /// The service answered and said no
    #[error("captcha validation failed")]
    Failed,

    /// The service could not be reached or answered nonsense
    #[error("captcha service error: {0}")]
    Service(String),
}

impl CaptchaError {
    pub fn code(&self) -> &'static str {
        match self {
            CaptchaError::Missing => "COMMENTS_CAPTCHA_MISSING",
            CaptchaError::Failed => "COMMENTS_CAPTCHA_FAILED",
            CaptchaError::Service(_) => "COMMENTS_CAPTCHA_SERVICE",
        }
    }
}

/// Default proof-of-work difficulty; each level is 16x harder than the last
pub const DEFAULT_DIFFICULTY_LEVEL: u32 = 3;

/// A challenge for the client to solve before submitting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptchaChallenge {
    /// Captcha service the client solves against
    #[serde(rename = "captchaURL")]
    pub url: String,
    #[serde(rename = "captchaChallenge")]
    pub challenge: String,
}

/// Verifies a captcha token submitted with a comment.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<(), CaptchaError>;

    /// Challenge to send with the comment list. Providers without one
    /// return `None`.
    async fn challenge(&self) -> Result<Option<CaptchaChallenge>, CaptchaError> {
        Ok(None)
    }
}

/// Verifier with a fixed answer. `accept_all()` backs the `none` provider.
#[derive(Debug, Clone, Copy)]
pub struct StaticCaptcha {
    accept: bool,
}

impl StaticCaptcha {
    pub fn accept_all() -> Self {
        Self { accept: true }
    }

    pub fn reject_all() -> Self {
        Self { accept: false }
    }
}

#[async_trait]
impl CaptchaVerifier for StaticCaptcha {
    async fn verify(&self, _token: &str) -> Result<(), CaptchaError> {
        if self.accept {
            Ok(())
        } else {
            Err(CaptchaError::Failed)
        }
    }
}

/// Which captcha service guards submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptchaProvider {
    /// Google reCAPTCHA `siteverify`
    Recaptcha,
    /// Proof-of-work captcha API (`/Verify?challenge=&nonce=`)
    ProofOfWork,
    /// No captcha; every submission passes
    None,
}

/// Captcha configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaConfig {
    pub provider: CaptchaProvider,

    /// reCAPTCHA secret key or proof-of-work API token
    #[serde(default)]
    pub secret: String,

    /// Service base URL; defaults per provider
    #[serde(default)]
    pub url: Option<String>,

    /// Proof-of-work difficulty requested for new challenges
    #[serde(default = "default_difficulty_level")]
    pub difficulty_level: u32,
}

fn default_difficulty_level() -> u32 {
    DEFAULT_DIFFICULTY_LEVEL
}

/// Create a verifier based on config. No config means no captcha.
pub fn create_verifier(config: Option<&CaptchaConfig>) -> Result<Arc<dyn CaptchaVerifier>, CaptchaError> {
    let Some(config) = config else {
        return Ok(Arc::new(StaticCaptcha::accept_all()));
    };

    Ok(match config.provider {
        CaptchaProvider::Recaptcha => Arc::new(RecaptchaVerifier::new(
            config.secret.clone(),
            config.url.clone(),
        )?),
        CaptchaProvider::ProofOfWork => {
            let url = config.url.clone().ok_or_else(|| {
                CaptchaError::Service("proof_of_work captcha requires a url".to_string())
            })?;
            Arc::new(ProofOfWorkVerifier::new(
                config.secret.clone(),
                url,
                config.difficulty_level,
            )?)
        }
        CaptchaProvider::None => Arc::new(StaticCaptcha::accept_all()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_captcha() {
        assert!(StaticCaptcha::accept_all().verify("").await.is_ok());
        assert!(matches!(
            StaticCaptcha::reject_all().verify("token").await,
            Err(CaptchaError::Failed)
        ));
    }

    #[test]
    fn test_provider_names() {
        let config: CaptchaConfig =
            serde_json::from_str(r#"{"provider":"proof_of_work","secret":"t"}"#).unwrap();
        assert_eq!(config.provider, CaptchaProvider::ProofOfWork);
        assert!(config.url.is_none());
        assert_eq!(config.difficulty_level, DEFAULT_DIFFICULTY_LEVEL);
    }

    #[test]
    fn test_proof_of_work_needs_url() {
        let config = CaptchaConfig {
            provider: CaptchaProvider::ProofOfWork,
            secret: "t".to_string(),
            url: None,
            difficulty_level: DEFAULT_DIFFICULTY_LEVEL,
        };
        assert!(create_verifier(Some(&config)).is_err());
    }

    #[tokio::test]
    async fn test_no_config_accepts() {
        let verifier = create_verifier(None).unwrap();
        assert!(verifier.verify("").await.is_ok());
        assert!(verifier.challenge().await.unwrap().is_none());
    }

    #[test]
    fn test_challenge_wire_names() {
        let challenge = CaptchaChallenge {
            url: "https://pow.example".to_string(),
            challenge: "c1".to_string(),
        };
        let json = serde_json::to_value(&challenge).unwrap();
        assert_eq!(json["captchaURL"], "https://pow.example");
        assert_eq!(json["captchaChallenge"], "c1");
    }
}
