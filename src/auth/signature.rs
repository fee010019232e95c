//! HMAC-SHA256 over `body ++ nonce`

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::errors::{AuthError, AuthResult};

type HmacSha256 = Hmac<Sha256>;

fn mac_over(secret: &[u8], body: &[u8], nonce: &str) -> AuthResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| AuthError::InvalidKey)?;
    mac.update(body);
    mac.update(nonce.as_bytes());
    Ok(mac)
}

/// Computes the credential a client sends: lowercase hex of the HMAC.
pub fn sign(secret: &[u8], body: &[u8], nonce: &str) -> AuthResult<String> {
    let mac = mac_over(secret, body, nonce)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a hex credential against `secret`, `body` and `nonce`.
///
/// Non-hex input is simply a mismatch. Comparison is constant-time.
pub fn verify(secret: &[u8], body: &[u8], nonce: &str, credential: &str) -> bool {
    let Ok(expected) = hex::decode(credential.trim()) else {
        return false;
    };
    match mac_over(secret, body, nonce) {
        Ok(mac) => mac.verify_slice(&expected).is_ok(),
        Err(_) => false,
    }
}
