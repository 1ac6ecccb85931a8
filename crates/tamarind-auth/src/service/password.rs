//! Password hashing

use tamarind_common::TamarindError;

use crate::model::MAX_PASSWORD_LENGTH;

/// Hash a password with bcrypt at the given cost
pub fn hash_password(password: &str, cost: u32) -> anyhow::Result<String> {
    if password.is_empty() {
        return Err(TamarindError::validation("password must not be empty"));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(TamarindError::validation(format!(
            "password exceeds {} bytes",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(bcrypt::hash(password, cost)?)
}

/// Check a password against a stored digest; malformed digests never match
pub fn verify_password(password: &str, digest: &str) -> bool {
    bcrypt::verify(password, digest).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let digest = hash_password("s3cret", 4).unwrap();
        assert_ne!(digest, "s3cret");
        assert!(verify_password("s3cret", &digest));
        assert!(!verify_password("wrong", &digest));
    }

    #[test]
    fn test_hash_is_salted() {
        let first = hash_password("same", 4).unwrap();
        let second = hash_password("same", 4).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_input() {
        assert!(hash_password("", 4).is_err());
        assert!(hash_password(&"p".repeat(MAX_PASSWORD_LENGTH + 1), 4).is_err());
        assert!(!verify_password("anything", "not-a-bcrypt-digest"));
    }
}
