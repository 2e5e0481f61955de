//! Argon2 password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::{error, instrument};

use crate::errors::ServiceError;

/// Hashes `password` with a fresh random salt and default Argon2 parameters.
#[instrument(skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    if password.is_empty() {
        return Err(ServiceError::ValidationError(
            "Password cannot be empty".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hashing failed");
            ServiceError::HashError(e.to_string())
        })
}

/// Returns `Ok(false)` on a mismatch; errors only for a malformed stored hash.
#[instrument(skip(stored_hash, candidate), err(Display))]
pub fn verify_password(stored_hash: &str, candidate: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!(error = %e, "stored password hash is malformed");
        ServiceError::HashError(e.to_string())
    })?;

    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ServiceError::HashError(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct horse").unwrap());
        assert!(!verify_password(&hash, "battery staple").unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("pw-123456").unwrap();
        let b = hash_password("pw-123456").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_password_and_bad_hash_are_errors() {
        assert_matches!(hash_password(""), Err(ServiceError::ValidationError(_)));
        assert_matches!(
            verify_password("plaintext", "x"),
            Err(ServiceError::HashError(_))
        );
    }
}
