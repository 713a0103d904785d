//! Cryptographic helpers for the in-memory credential provider
//!
//! - **Constant-time comparison** of password digests and tokens
//! - **Salted SHA-256** password digests
//! - **Random identifiers** for accounts and client cookies

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Salt length for password digests
pub const SALT_LEN: usize = 16;

/// Performs constant-time comparison of two byte slices.
///
/// The comparison takes the same amount of time regardless of where (or if)
/// the inputs differ, so response timing cannot be used to guess a digest.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Constant-time comparison of two strings
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

/// Stored form of a password: base64 salt and base64 digest
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    salt: String,
    digest: String,
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordDigest").finish_non_exhaustive()
    }
}

impl PasswordDigest {
    /// Hash `password` under a fresh random salt
    pub fn new(password: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::with_salt(password, &salt)
    }

    fn with_salt(password: &str, salt: &[u8]) -> Self {
        Self {
            salt: STANDARD.encode(salt),
            digest: STANDARD.encode(digest(salt, password)),
        }
    }

    /// Check `password` against this digest in constant time
    pub fn verify(&self, password: &str) -> bool {
        let Ok(salt) = STANDARD.decode(&self.salt) else {
            return false;
        };
        let candidate = STANDARD.encode(digest(&salt, password));
        constant_time_str_eq(&candidate, &self.digest)
    }
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

/// Random lowercase hex string carrying `bytes` bytes of entropy
pub fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq_same() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(constant_time_str_eq("secret123", "secret123"));
    }

    #[test]
    fn test_constant_time_eq_different() {
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }

    #[test]
    fn test_password_digest_verifies() {
        let stored = PasswordDigest::new("correct horse");
        assert!(stored.verify("correct horse"));
        assert!(!stored.verify("correct horsE"));
        assert!(!stored.verify(""));
    }

    #[test]
    fn test_salts_differ() {
        let a = PasswordDigest::new("same password");
        let b = PasswordDigest::new("same password");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fixed_salt_is_deterministic() {
        let a = PasswordDigest::with_salt("pw", b"0123456789abcdef");
        let b = PasswordDigest::with_salt("pw", b"0123456789abcdef");
        assert_eq!(a, b);
    }

    #[test]
    fn test_debug_hides_digest() {
        let stored = PasswordDigest::new("pw");
        assert!(!format!("{:?}", stored).contains(&stored.digest));
    }

    #[test]
    fn test_random_hex() {
        let id = random_hex(16);
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(random_hex(16), random_hex(16));
    }
}
