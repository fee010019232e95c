//! Admin request verification
//!
//! Flow:
//!
//! 1. No credential → `MissingCredentials` (show the login form). The nonce
//!    is left alone.
//! 2. Credential present → check it against `body ++ nonce` and rotate the
//!    nonce in the same critical section, whatever the result.
//! 3. Match → `Authenticated(payload)`, otherwise `Rejected`.

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::errors::{AuthError, AuthResult};
use super::nonce::NonceCell;
use super::signature;

/// Scheme name accepted in front of the hex credential
const SCHEME: &str = "HMAC-SHA256";

/// Result of checking one admin request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome<T> {
    /// No credential material was sent
    MissingCredentials,
    /// A credential was sent and did not match
    Rejected,
    /// The credential matched; carries the signed payload
    Authenticated(T),
}

impl<T> AuthOutcome<T> {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated(_))
    }

    /// True only for a wrong credential, not for a missing one.
    pub fn is_incorrect(&self) -> bool {
        matches!(self, AuthOutcome::Rejected)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AuthOutcome<U> {
        match self {
            AuthOutcome::MissingCredentials => AuthOutcome::MissingCredentials,
            AuthOutcome::Rejected => AuthOutcome::Rejected,
            AuthOutcome::Authenticated(payload) => AuthOutcome::Authenticated(f(payload)),
        }
    }
}

/// Extracts the credential from an `Authorization` header value.
///
/// Accepts a bare hex string or `HMAC-SHA256 <hex>`. Blank means absent.
pub fn parse_credential(header: Option<&str>) -> Option<&str> {
    let value = header?.trim();
    let value = match value.strip_prefix(SCHEME) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => value,
    };
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Verifier for the single admin identity.
pub struct AdminAuth {
    secret: Vec<u8>,
    nonce: NonceCell,
}

impl AdminAuth {
    /// An empty secret disables admin access: every attempt is rejected.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        let secret = secret.into();
        if secret.is_empty() {
            warn!("admin secret is empty; admin access is disabled");
        }
        Self {
            secret,
            nonce: NonceCell::new(),
        }
    }

    /// Nonce to embed in the next admin page render.
    pub fn current_nonce(&self) -> String {
        self.nonce.current()
    }

    /// Checks `credential` over the raw request `body`.
    ///
    /// Returns the outcome and the nonce clients must use next.
    pub fn verify(&self, credential: Option<&str>, body: &[u8]) -> (AuthOutcome<Vec<u8>>, String) {
        let Some(credential) = credential.map(str::trim).filter(|c| !c.is_empty()) else {
            return (AuthOutcome::MissingCredentials, self.nonce.current());
        };

        let (accepted, next_nonce) = self.nonce.consume_with(|nonce| {
            !self.secret.is_empty() && signature::verify(&self.secret, body, nonce, credential)
        });

        if accepted {
            info!("admin request authenticated");
            (AuthOutcome::Authenticated(body.to_vec()), next_nonce)
        } else {
            warn!("admin request rejected");
            (AuthOutcome::Rejected, next_nonce)
        }
    }

    /// Like [`verify`](Self::verify), then decodes the signed body as JSON.
    ///
    /// An empty body decodes as `{}`.
    pub fn verify_json<T: DeserializeOwned>(
        &self,
        credential: Option<&str>,
        body: &[u8],
    ) -> (AuthResult<AuthOutcome<T>>, String) {
        let (outcome, next_nonce) = self.verify(credential, body);
        let decoded = match outcome {
            AuthOutcome::Authenticated(raw) => {
                let json: &[u8] = if raw.iter().all(u8::is_ascii_whitespace) {
                    b"{}"
                } else {
                    &raw
                };
                serde_json::from_slice(json)
                    .map(AuthOutcome::Authenticated)
                    .map_err(|e| AuthError::MalformedPayload(e.to_string()))
            }
            AuthOutcome::MissingCredentials => Ok(AuthOutcome::MissingCredentials),
            AuthOutcome::Rejected => Ok(AuthOutcome::Rejected),
        };
        (decoded, next_nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::signature::sign;

    #[test]
    fn test_parse_credential() {
        assert_eq!(parse_credential(None), None);
        assert_eq!(parse_credential(Some("   ")), None);
        assert_eq!(parse_credential(Some("HMAC-SHA256 ")), None);
        assert_eq!(parse_credential(Some("HMAC-SHA256")), None);
        assert_eq!(parse_credential(Some("  HMAC-SHA256 \t")), None);
        assert_eq!(parse_credential(Some("abc123")), Some("abc123"));
        assert_eq!(parse_credential(Some("HMAC-SHA256 abc123")), Some("abc123"));
    }

    #[test]
    fn test_bare_scheme_is_missing_credentials() {
        let auth = AdminAuth::new("secret");
        let nonce = auth.current_nonce();

        let (outcome, next) = auth.verify(parse_credential(Some("HMAC-SHA256 ")), b"{}");
        assert_eq!(outcome, AuthOutcome::MissingCredentials);
        assert_eq!(next, nonce);
    }

    #[test]
    fn test_missing_credentials_keep_nonce() {
        let auth = AdminAuth::new("secret");
        let nonce = auth.current_nonce();

        let (outcome, next) = auth.verify(None, b"{}");
        assert_eq!(outcome, AuthOutcome::MissingCredentials);
        assert_eq!(next, nonce);
        assert_eq!(auth.current_nonce(), nonce);
    }

    #[test]
    fn test_valid_credential_authenticates_and_rotates() {
        let auth = AdminAuth::new("secret");
        let nonce = auth.current_nonce();
        let credential = sign(b"secret", b"{}", &nonce).unwrap();

        let (outcome, next) = auth.verify(Some(&credential), b"{}");
        assert_eq!(outcome, AuthOutcome::Authenticated(b"{}".to_vec()));
        assert_ne!(next, nonce);
    }

    #[test]
    fn test_wrong_secret_rejected_and_rotates() {
        let auth = AdminAuth::new("secret");
        let nonce = auth.current_nonce();
        let credential = sign(b"guess", b"{}", &nonce).unwrap();

        let (outcome, next) = auth.verify(Some(&credential), b"{}");
        assert!(outcome.is_incorrect());
        assert_ne!(next, nonce);
    }

    #[test]
    fn test_replay_rejected() {
        let auth = AdminAuth::new("secret");
        let credential = sign(b"secret", b"{}", &auth.current_nonce()).unwrap();

        assert!(auth.verify(Some(&credential), b"{}").0.is_authenticated());
        assert_eq!(auth.verify(Some(&credential), b"{}").0, AuthOutcome::Rejected);
    }

    #[test]
    fn test_empty_secret_disables_admin() {
        let auth = AdminAuth::new("");
        let credential = sign(b"", b"{}", &auth.current_nonce()).unwrap();
        assert_eq!(auth.verify(Some(&credential), b"{}").0, AuthOutcome::Rejected);
    }

    #[test]
    fn test_verify_json_decodes_payload() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Payload {
            skip: u32,
        }

        let auth = AdminAuth::new("secret");
        let body = br#"{"skip":3}"#;
        let credential = sign(b"secret", body, &auth.current_nonce()).unwrap();

        let (outcome, _) = auth.verify_json::<Payload>(Some(&credential), body);
        assert_eq!(outcome.unwrap(), AuthOutcome::Authenticated(Payload { skip: 3 }));
    }

    #[test]
    fn test_verify_json_malformed_payload() {
        let auth = AdminAuth::new("secret");
        let body = b"not json";
        let credential = sign(b"secret", body, &auth.current_nonce()).unwrap();

        let (outcome, _) = auth.verify_json::<serde_json::Value>(Some(&credential), body);
        assert!(matches!(outcome, Err(AuthError::MalformedPayload(_))));
    }

    #[test]
    fn test_outcome_map() {
        let outcome: AuthOutcome<u8> = AuthOutcome::Authenticated(2);
        assert_eq!(outcome.map(|v| v * 2), AuthOutcome::Authenticated(4));
        let missing: AuthOutcome<u8> = AuthOutcome::MissingCredentials;
        assert_eq!(missing.map(|v| v * 2), AuthOutcome::MissingCredentials);
    }
}
