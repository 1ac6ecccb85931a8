//! Utility functions for Tamarind

use std::sync::LazyLock;

use crate::error::TamarindError;

/// Regex pattern for validating identifiers (namespace, group, key, username)
static VALID_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new("^[a-zA-Z0-9_.:-]*$").expect("Invalid regex pattern"));

/// Maximum length accepted for any identifier
pub const MAX_NAME_LENGTH: usize = 128;

/// Validate a string contains only allowed characters
///
/// Allowed characters: alphanumeric, underscore, dot, colon, hyphen
///
/// # Examples
///
/// ```
/// use tamarind_common::is_valid;
///
/// assert!(is_valid("db.url"));
/// assert!(is_valid("app_name:v1"));
/// assert!(!is_valid("invalid/path"));
/// assert!(!is_valid("with spaces"));
/// ```
pub fn is_valid(str: &str) -> bool {
    VALID_PATTERN.is_match(str)
}

/// Validate an identifier, reporting which field was rejected
pub fn validate_name(field: &str, value: &str) -> anyhow::Result<()> {
    if value.is_empty() {
        return Err(TamarindError::validation(format!("{} must not be empty", field)));
    }
    if value.len() > MAX_NAME_LENGTH {
        return Err(TamarindError::validation(format!(
            "{} exceeds {} characters",
            field, MAX_NAME_LENGTH
        )));
    }
    if !is_valid(value) {
        return Err(TamarindError::validation(format!(
            "{} contains illegal characters",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_alphanumeric() {
        assert!(is_valid("abc123"));
        assert!(is_valid("test_value"));
        assert!(is_valid("test-value"));
        assert!(is_valid("test.value"));
        assert!(is_valid("test:value"));
    }

    #[test]
    fn test_is_valid_invalid_chars() {
        assert!(!is_valid("test value"));
        assert!(!is_valid("test@value"));
        assert!(!is_valid("test/value"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("namespace", "teamA").is_ok());

        let err = validate_name("namespace", "").unwrap_err();
        assert_eq!(
            err.downcast_ref::<TamarindError>(),
            Some(&TamarindError::Validation(
                "namespace must not be empty".to_string()
            ))
        );

        assert!(validate_name("key", "a/b").is_err());
        assert!(validate_name("key", &"k".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }
}
