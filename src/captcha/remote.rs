//! HTTP-backed captcha services

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{CaptchaChallenge, CaptchaError, CaptchaVerifier, CAPTCHA_TIMEOUT};

const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

fn build_client() -> Result<reqwest::Client, CaptchaError> {
    reqwest::Client::builder()
        .timeout(CAPTCHA_TIMEOUT)
        .build()
        .map_err(|e| CaptchaError::Service(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    #[serde(default)]
    success: bool,
}

/// Google reCAPTCHA verifier
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret: String,
    url: String,
}

impl RecaptchaVerifier {
    pub fn new(secret: String, url: Option<String>) -> Result<Self, CaptchaError> {
        Ok(Self {
            client: build_client()?,
            secret,
            url: url.unwrap_or_else(|| RECAPTCHA_VERIFY_URL.to_string()),
        })
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str) -> Result<(), CaptchaError> {
        if token.is_empty() {
            return Err(CaptchaError::Missing);
        }

        let response = self
            .client
            .post(&self.url)
            .form(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await
            .map_err(|e| CaptchaError::Service(e.to_string()))?;

        let body: SiteVerifyResponse = response
            .json()
            .await
            .map_err(|e| CaptchaError::Service(e.to_string()))?;

        if body.success {
            Ok(())
        } else {
            Err(CaptchaError::Failed)
        }
    }
}

/// Refill in the background once fewer than this many challenges are left
const CHALLENGE_LOW_WATER: usize = 5;

/// Challenges fetched ahead of time, handed out once each.
#[derive(Debug, Default)]
pub(crate) struct ChallengePool {
    queue: Mutex<VecDeque<String>>,
    refilling: AtomicBool,
}

impl ChallengePool {
    pub(crate) fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub(crate) fn take(&self) -> Option<String> {
        self.queue.lock().pop_front()
    }

    pub(crate) fn refill(&self, challenges: Vec<String>) {
        self.queue.lock().extend(challenges);
    }

    /// Claims the single background refill slot.
    fn begin_refill(&self) -> bool {
        self.refilling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn end_refill(&self) {
        self.refilling.store(false, Ordering::Release);
    }
}

/// Fetches batches of challenges from `GetChallenges`.
#[derive(Clone)]
struct ChallengeLoader {
    client: reqwest::Client,
    api_token: String,
    url: String,
    difficulty_level: u32,
}

impl ChallengeLoader {
    async fn fetch(&self) -> Result<Vec<String>, CaptchaError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_token)
            .query(&[("difficultyLevel", self.difficulty_level)])
            .send()
            .await
            .map_err(|e| CaptchaError::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptchaError::Service(format!(
                "challenge api returned http {}",
                status
            )));
        }

        let challenges: Vec<String> = response
            .json()
            .await
            .map_err(|e| CaptchaError::Service(e.to_string()))?;
        if challenges.is_empty() {
            return Err(CaptchaError::Service(
                "challenge api returned no challenges".to_string(),
            ));
        }
        Ok(challenges)
    }
}

/// Proof-of-work captcha verifier.
///
/// Hands out challenges from a pool refilled from the captcha service and
/// verifies tokens of the form `<challenge>:<nonce>`.
pub struct ProofOfWorkVerifier {
    client: reqwest::Client,
    api_token: String,
    base_url: String,
    verify_url: String,
    loader: ChallengeLoader,
    pool: Arc<ChallengePool>,
}

impl ProofOfWorkVerifier {
    pub fn new(api_token: String, base_url: String, difficulty_level: u32) -> Result<Self, CaptchaError> {
        let client = build_client()?;
        let base = base_url.trim_end_matches('/');
        let loader = ChallengeLoader {
            client: client.clone(),
            api_token: api_token.clone(),
            url: format!("{}/GetChallenges", base),
            difficulty_level,
        };
        Ok(Self {
            verify_url: format!("{}/Verify", base),
            client,
            api_token,
            base_url,
            loader,
            pool: Arc::new(ChallengePool::default()),
        })
    }

    fn spawn_refill(&self) {
        if !self.pool.begin_refill() {
            return;
        }
        let loader = self.loader.clone();
        let pool = Arc::clone(&self.pool);
        tokio::spawn(async move {
            match loader.fetch().await {
                Ok(challenges) => {
                    debug!(count = challenges.len(), "captcha challenges refilled");
                    pool.refill(challenges);
                }
                Err(e) => warn!(error = %e, "captcha challenge refill failed"),
            }
            pool.end_refill();
        });
    }
}

/// Splits a `challenge:nonce` token.
pub(crate) fn split_pow_token(token: &str) -> Result<(&str, &str), CaptchaError> {
    match token.split_once(':') {
        Some((challenge, nonce)) if !challenge.is_empty() && !nonce.is_empty() => {
            Ok((challenge, nonce))
        }
        _ if token.is_empty() => Err(CaptchaError::Missing),
        _ => Err(CaptchaError::Failed),
    }
}

#[async_trait]
impl CaptchaVerifier for ProofOfWorkVerifier {
    async fn verify(&self, token: &str) -> Result<(), CaptchaError> {
        let (challenge, nonce) = split_pow_token(token)?;

        let response = self
            .client
            .post(&self.verify_url)
            .bearer_auth(&self.api_token)
            .query(&[
                ("challenge", challenge),
                ("nonce", nonce),
                ("token", self.api_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CaptchaError::Service(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CaptchaError::Failed)
        }
    }

    async fn challenge(&self) -> Result<Option<CaptchaChallenge>, CaptchaError> {
        let left = self.pool.len();
        if left == 0 {
            self.pool.refill(self.loader.fetch().await?);
        } else if left < CHALLENGE_LOW_WATER {
            self.spawn_refill();
        }

        let challenge = self
            .pool
            .take()
            .ok_or_else(|| CaptchaError::Service("no captcha challenge available".to_string()))?;
        Ok(Some(CaptchaChallenge {
            url: self.base_url.clone(),
            challenge,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pow_token() {
        assert_eq!(split_pow_token("abc:123").unwrap(), ("abc", "123"));
        assert!(matches!(split_pow_token(""), Err(CaptchaError::Missing)));
        assert!(matches!(split_pow_token("abc"), Err(CaptchaError::Failed)));
        assert!(matches!(split_pow_token(":123"), Err(CaptchaError::Failed)));
    }

    fn pow_verifier() -> ProofOfWorkVerifier {
        ProofOfWorkVerifier::new("t".to_string(), "https://captcha.example/api/".to_string(), 3)
            .unwrap()
    }

    #[test]
    fn test_service_urls_joined() {
        let verifier = pow_verifier();
        assert_eq!(verifier.verify_url, "https://captcha.example/api/Verify");
        assert_eq!(verifier.loader.url, "https://captcha.example/api/GetChallenges");
        assert_eq!(verifier.loader.difficulty_level, 3);
    }

    #[test]
    fn test_challenge_pool_hands_out_each_once() {
        let pool = ChallengePool::default();
        pool.refill(vec!["a".to_string(), "b".to_string()]);

        assert_eq!(pool.take().as_deref(), Some("a"));
        assert_eq!(pool.take().as_deref(), Some("b"));
        assert_eq!(pool.take(), None);
    }

    #[test]
    fn test_single_refill_slot() {
        let pool = ChallengePool::default();
        assert!(pool.begin_refill());
        assert!(!pool.begin_refill());
        pool.end_refill();
        assert!(pool.begin_refill());
    }

    #[tokio::test]
    async fn test_challenge_served_from_pool() {
        let verifier = pow_verifier();
        let stocked: Vec<String> = (0..CHALLENGE_LOW_WATER).map(|i| format!("c{}", i)).collect();
        verifier.pool.refill(stocked);

        let challenge = verifier.challenge().await.unwrap().unwrap();
        assert_eq!(challenge.challenge, "c0");
        assert_eq!(challenge.url, "https://captcha.example/api/");
        assert_eq!(verifier.pool.len(), CHALLENGE_LOW_WATER - 1);
    }

    #[tokio::test]
    async fn test_recaptcha_requires_token() {
        let verifier = RecaptchaVerifier::new("secret".to_string(), None).unwrap();
        assert!(matches!(verifier.verify("").await, Err(CaptchaError::Missing)));
    }
}
