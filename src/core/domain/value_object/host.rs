use crate::core::domain::error::ValidationError;

/// A validated host name or IP literal, as it appears in a URL authority.
///
/// IPv6 literals keep their brackets so the value can be joined with a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host(String);

impl Host {
    /// Creates a new host without validation.
    #[cfg(test)]
    pub(crate) fn new_unchecked(host: String) -> Self {
        Self(host)
    }

    /// Returns the host as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validates the host part of a connection URI.
pub(crate) fn validate_host(host: Option<&str>) -> Result<Host, ValidationError> {
    match host {
        Some(host) if !host.is_empty() => Ok(Host(host.to_string())),
        _ => Err(ValidationError::Field {
            field: "host".to_string(),
            message: "hostname not set".to_string(),
        }),
    }
}
