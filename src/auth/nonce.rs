//! Process-wide admin nonce
//!
//! One unguessable token per process, replaced after every authentication
//! attempt. The cell is the only owner; callers see it through `current`,
//! `rotate` and `consume_with`.

use base64::Engine;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;

/// Generate a fresh nonce: 256 random bits as URL-safe base64.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Mutex-guarded single nonce.
pub struct NonceCell {
    current: Mutex<String>,
}

impl NonceCell {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(generate_nonce()),
        }
    }

    /// The nonce a client must bind its next request to.
    pub fn current(&self) -> String {
        self.current.lock().clone()
    }

    /// Replace the nonce and return the new one.
    pub fn rotate(&self) -> String {
        let mut current = self.current.lock();
        *current = generate_nonce();
        current.clone()
    }

    /// Run `check` against the current nonce, then rotate, under one lock.
    ///
    /// Two concurrent attempts can never both observe the same nonce.
    /// Returns the check result and the nonce now in force.
    pub fn consume_with<R>(&self, check: impl FnOnce(&str) -> R) -> (R, String) {
        let mut current = self.current.lock();
        let result = check(current.as_str());
        *current = generate_nonce();
        (result, current.clone())
    }
}

impl Default for NonceCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_nonce_generation() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_ne!(a, b);
        // base64 of 32 bytes without padding
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn test_rotate_replaces_current() {
        let cell = NonceCell::new();
        let before = cell.current();
        let after = cell.rotate();
        assert_ne!(before, after);
        assert_eq!(cell.current(), after);
    }

    #[test]
    fn test_consume_sees_old_and_leaves_new() {
        let cell = NonceCell::new();
        let before = cell.current();

        let (seen, next) = cell.consume_with(|nonce| nonce.to_string());
        assert_eq!(seen, before);
        assert_ne!(next, before);
        assert_eq!(cell.current(), next);
    }

    #[test]
    fn test_concurrent_consumers_never_share_a_nonce() {
        let cell = Arc::new(NonceCell::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| cell.consume_with(|n| n.to_string()).0)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for nonce in handle.join().unwrap() {
                assert!(seen.insert(nonce), "nonce consumed twice");
            }
        }
        assert_eq!(seen.len(), 400);
    }
}
