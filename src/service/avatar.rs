//! Avatar identity derived from a commenter's email
//!
//! The email is normalized (trimmed, lowercased) and hashed; only the
//! derived values are kept. The email itself never reaches the store.

use md5::Md5;
use sha2::{Digest, Sha256};

/// Salt mixed into the avatar hash, which names the commenter's stored
/// avatar image.
///
/// This is not a privacy boundary: `gravatarURL` carries the unsalted email
/// MD5 and is public alongside the hash.
pub const AVATAR_SALT: &str = "983q4gh_8778g4ilb.sDkjg09834goj4p9-023u0_mjpmodsmg";

pub const GRAVATAR_BASE_URL: &str = "https://www.gravatar.com/avatar/";

/// Values derived from one email address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarIdentity {
    /// Five hex chars of the email MD5 (chars 5..10)
    pub user_id: String,
    /// First six hex chars of SHA-256(md5hex ++ salt)
    pub avatar_hash: String,
    pub gravatar_url: String,
    /// `md5hex ++ salt`, the input the identicon is drawn from. Never stored.
    pub identicon_seed: String,
}

impl AvatarIdentity {
    /// Derives the identity, or `None` for a blank email.
    pub fn from_email(email: &str) -> Option<Self> {
        let normalized = email.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }

        let md5_hex = hex::encode(Md5::digest(normalized.as_bytes()));
        let identicon_seed = format!("{}{}", md5_hex, AVATAR_SALT);
        let salted = hex::encode(Sha256::digest(identicon_seed.as_bytes()));

        Some(Self {
            user_id: md5_hex[5..10].to_string(),
            avatar_hash: salted[..6].to_string(),
            gravatar_url: format!("{}{}", GRAVATAR_BASE_URL, md5_hex),
            identicon_seed,
        })
    }
}
