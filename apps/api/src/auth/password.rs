//! Argon2id password hashing. Hashes are stored as PHC strings
//! (`$argon2id$v=19$m=19456,t=2,p=1$...`) in `users.password_hash`.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

pub use argon2::password_hash::Error as PasswordHashError;

/// Hashes with a fresh random salt and the default Argon2id parameters.
pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch, `Err` only when the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordHashError> {
    let parsed = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("HelloWorld").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("HelloWorld", &hash).unwrap());
        assert!(!verify_password("helloworld", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        assert_ne!(hash_password("secret1").unwrap(), hash_password("secret1").unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }
}
