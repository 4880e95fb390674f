use crate::core::domain::error::ValidationError;

/// A validated GridServer account name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    /// Creates a new username without validation.
    pub(crate) fn new_unchecked(username: String) -> Self {
        Self(username)
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validates a username taken from the connection URI.
pub(crate) fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::Field {
            field: "username".to_string(),
            message: "username not set".to_string(),
        });
    }
    if username.chars().any(char::is_control) {
        return Err(ValidationError::Format(
            "Username cannot contain control characters".to_string(),
        ));
    }
    Ok(())
}
