//! Password hashing module
//!
//! Admin passwords are hashed with Argon2id using the argon2 crate's
//! default parameters and a random salt per hash.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password using Argon2id.
///
/// Returns the PHC string (algorithm, parameters, salt and hash).
///
/// ```ignore
/// use jcpc::services::password::hash_password;
///
/// let hash = hash_password("correct horse")?;
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
        .context("Password hashing failed")?;

    Ok(password_hash.to_string())
}

/// Verify a password against a stored PHC hash.
///
/// A mismatch is `Ok(false)`. A malformed hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))
        .context("Failed to parse password hash")?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e))
            .context("Password verification error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_uses_argon2id_with_random_salt() {
        let hash1 = hash_password("motdepasse123").expect("Failed to hash password");
        let hash2 = hash_password("motdepasse123").expect("Failed to hash password");

        assert!(hash1.starts_with("$argon2id$"));
        assert_ne!(hash1, hash2);
        assert!(!hash1.contains("motdepasse123"));
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("motdepasse123").unwrap();
        assert!(verify_password("motdepasse123", &hash).unwrap());
        assert!(!verify_password("mauvais-mot", &hash).unwrap());
    }

    #[test]
    fn test_verify_accented_password() {
        let hash = hash_password("sécurité-été").unwrap();
        assert!(verify_password("sécurité-été", &hash).unwrap());
        assert!(!verify_password("securite-ete", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("password", "not-a-phc-string").is_err());
    }
}
