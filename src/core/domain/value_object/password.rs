use crate::core::domain::error::ValidationError;
use std::fmt;

/// A GridServer password (plaintext, kept only for HTTP Basic authentication).
///
/// An empty password is legitimate. What must be present is the password
/// marker in the URI (`user:@host`), otherwise construction fails.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Creates a new password without validation.
    pub(crate) fn new_unchecked(password: String) -> Self {
        Self(password)
    }

    /// Returns the password as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Validates that a password was supplied at all.
pub(crate) fn validate_password(password: Option<&str>) -> Result<(), ValidationError> {
    match password {
        Some(_) => Ok(()),
        None => Err(ValidationError::Field {
            field: "password".to_string(),
            message: "password not set".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password() {
        assert!(validate_password(Some("secret")).is_ok());
        assert!(validate_password(Some("")).is_ok());
        assert!(validate_password(None).is_err());
    }

    #[test]
    fn test_password_is_redacted_in_debug() {
        let password = Password::new_unchecked("hunter2".to_string());
        assert_eq!(format!("{:?}", password), "Password(***)");
        assert_eq!(password.as_str(), "hunter2");
    }
}
