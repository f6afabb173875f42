//! Password hashing capability.
//!
//! PBKDF2-HMAC-SHA256 with a per-password random salt, serialized as a
//! self-describing PHC string (`$pbkdf2-sha256$...`). The rest of the crate
//! consumes this as an opaque `hash`/`verify` pair — nothing outside this
//! module knows or cares which KDF is in use.

use pbkdf2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Pbkdf2,
};
use std::sync::OnceLock;

use super::AccountError;

/// Hash a plaintext password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Pbkdf2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::Hash(e.to_string()))
}

/// Verify a plaintext password against a stored PHC string.
///
/// An unparseable stored hash verifies as false rather than erroring; a
/// corrupted credential row must fail closed.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok()
}

static DUMMY_HASH: OnceLock<String> = OnceLock::new();

/// Run a full verification against a throwaway hash.
///
/// Called when the submitted email matches no account, so that the
/// not-found path costs roughly the same as a wrong-password check.
pub fn burn_verification(password: &str) {
    let dummy = DUMMY_HASH
        .get_or_init(|| hash_password("gatelock-timing-filler").unwrap_or_default());
    let _ = verify_password(password, dummy);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$pbkdf2-sha256$"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same password", &a));
        assert!(verify_password("same password", &b));
    }

    #[test]
    fn garbage_stored_hash_fails_closed() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn burn_verification_does_not_panic() {
        burn_verification("some password");
        burn_verification("");
    }
}
