use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use std::sync::LazyLock;

use crate::error::UserError;

/// Argon2id memory cost in KiB.
const MEMORY_COST_KIB: u32 = 19 * 1024;
const ITERATIONS: u32 = 2;
const PARALLELISM: u32 = 1;

fn hasher() -> Result<Argon2<'static>, UserError> {
    let params = Params::new(MEMORY_COST_KIB, ITERATIONS, PARALLELISM, None)
        .map_err(|e| UserError::Hashing(format!("invalid argon2 params: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password into a salted PHC string.
pub fn hash(password: &str) -> Result<String, UserError> {
    let salt = SaltString::generate(&mut OsRng);

    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| UserError::Hashing(e.to_string()))
}

/// Verify a candidate against a stored PHC string.
///
/// A mismatch is `InvalidCredentials`; a stored value that is not a PHC string
/// is a `Hashing` failure since it can only mean corrupted data.
pub fn verify(candidate: &str, stored: &str) -> Result<(), UserError> {
    let parsed =
        PasswordHash::new(stored).map_err(|e| UserError::Hashing(format!("invalid hash: {e}")))?;

    hasher()?
        .verify_password(candidate.as_bytes(), &parsed)
        .map_err(|e| match e {
            argon2::password_hash::Error::Password => UserError::InvalidCredentials,
            other => UserError::Hashing(other.to_string()),
        })
}

/// Stand-in hash for accounts that do not exist, built with the same params
/// as real hashes so a verify against it costs the same.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash("dummy-password-for-unknown-users").ok());

/// Runs a full verify against [`DUMMY_HASH`] and always fails with
/// `InvalidCredentials`, so an unknown account takes as long to reject as a
/// wrong password.
pub fn reject_unknown(candidate: &str) -> UserError {
    match DUMMY_HASH.as_deref() {
        Some(stored) => {
            let _ = verify(candidate, stored);
        }
        None => tracing::warn!("dummy password hash unavailable"),
    }
    UserError::InvalidCredentials
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_salted() {
        let first = hash("secret1").unwrap();
        let second = hash("secret1").unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
    }

    #[test]
    fn verify_accepts_the_original_password() {
        let stored = hash("correct-horse").unwrap();
        assert!(verify("correct-horse", &stored).is_ok());
    }

    #[test]
    fn verify_rejects_a_different_password() {
        let stored = hash("correct-horse").unwrap();
        assert!(matches!(
            verify("wrong-horse", &stored),
            Err(UserError::InvalidCredentials)
        ));
    }

    #[test]
    fn verify_reports_a_malformed_hash() {
        assert!(matches!(
            verify("anything", "not-a-phc-string"),
            Err(UserError::Hashing(_))
        ));
    }

    #[test]
    fn unknown_accounts_are_rejected_as_invalid_credentials() {
        assert!(matches!(
            reject_unknown("dummy-password-for-unknown-users"),
            UserError::InvalidCredentials
        ));
        assert!(matches!(reject_unknown("secret1"), UserError::InvalidCredentials));
        assert!(DUMMY_HASH.as_deref().is_some_and(|h| h.starts_with("$argon2id$")));
    }
}
