//! # Admin Authentication
//!
//! Nonce-bound HMAC authentication for the two privileged operations
//! (listing all comments, deleting a comment).
//!
//! A client proves it knows the admin secret by sending
//! `hex(HMAC-SHA256(secret, body ++ nonce))` where `nonce` is the server's
//! current nonce. Every attempt that carries a credential rotates the nonce,
//! accepted or not, so a captured request can never be replayed.
//!
//! ## Invariants
//! - Read-check-rotate of the nonce is one critical section
//! - Missing credentials and wrong credentials stay distinguishable
//! - Signature comparison is constant-time

pub mod errors;
pub mod nonce;
pub mod protocol;
pub mod signature;

pub use errors::{AuthError, AuthResult};
pub use nonce::{generate_nonce, NonceCell};
pub use protocol::{parse_credential, AdminAuth, AuthOutcome};
pub use signature::{sign, verify};
