//! Password hashing and session tokens
//!
//! Pure functions only - no HTTP framework dependencies. The API crate wires
//! these into its login/register handlers and auth middleware.
//!
//! Passwords are stored as SHA-256 of `salt:password` next to the per-user
//! random salt. Session tokens are opaque 32-byte random values, hex encoded,
//! persisted in the `sessions` table.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a random 16-byte salt, hex encoded
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

/// Hash a password with the given salt
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Verify a password against the stored salt and hash
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    // Constant-time comparison is not critical here (hashes, not secrets),
    // but compare the full strings regardless of early mismatch.
    let calculated = hash_password(password, salt);
    let mut diff = 0u8;
    if calculated.len() != expected_hash.len() {
        return false;
    }
    for (a, b) in calculated.bytes().zip(expected_hash.bytes()) {
        diff |= a ^ b;
    }
    diff == 0
}

/// Generate an opaque session token (32 random bytes, hex encoded)
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let salt = "abcd1234";
        assert_eq!(hash_password("secret", salt), hash_password("secret", salt));
    }

    #[test]
    fn test_hash_is_lowercase_sha256_of_salt_colon_password() {
        assert_eq!(
            hash_password("hunter2", "abcd1234"),
            "afbce42d76a65a0a0fcb977bed8f76d67d54d14b9d0aba643cced31256463c98"
        );
    }

    #[test]
    fn test_salt_changes_hash() {
        assert_ne!(hash_password("secret", "salt-a"), hash_password("secret", "salt-b"));
    }

    #[test]
    fn test_verify_password() {
        let salt = generate_salt();
        let hash = hash_password("hunter2", &salt);
        assert!(verify_password("hunter2", &salt, &hash));
        assert!(!verify_password("hunter3", &salt, &hash));
        assert!(!verify_password("hunter2", &salt, "deadbeef"));
    }

    #[test]
    fn test_token_shape() {
        let token = generate_session_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_session_token());
    }
}
