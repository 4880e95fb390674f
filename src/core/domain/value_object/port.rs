use crate::core::domain::error::ValidationError;

/// A validated TCP port number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port(u16);

impl Port {
    /// Port of the GridServer Director when the URI does not name one.
    pub const DIRECTOR_DEFAULT: Port = Port(8080);

    /// Creates a new port without validation.
    #[cfg(test)]
    pub(crate) fn new_unchecked(port: u16) -> Self {
        Self(port)
    }

    /// Returns the port number.
    pub fn get(&self) -> u16 {
        self.0
    }
}

/// Parses and validates a port as written in a URI.
pub(crate) fn validate_port(port: &str) -> Result<Port, ValidationError> {
    let number: u16 = port.parse().map_err(|_| ValidationError::Field {
        field: "port".to_string(),
        message: format!("invalid port: {:?}", port),
    })?;
    if number == 0 {
        return Err(ValidationError::Field {
            field: "port".to_string(),
            message: "Port cannot be 0".to_string(),
        });
    }
    Ok(Port(number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_port_valid() {
        assert_eq!(validate_port("8080").unwrap().get(), 8080);
        assert_eq!(validate_port("1").unwrap().get(), 1);
        assert_eq!(validate_port("65535").unwrap().get(), 65535);
    }

    #[test]
    fn test_validate_port_invalid() {
        assert!(validate_port("0").is_err());
        assert!(validate_port("65536").is_err());
        assert!(validate_port("port").is_err());
        assert!(validate_port("-1").is_err());
    }

    #[test]
    fn test_port_new_unchecked() {
        assert_eq!(Port::new_unchecked(1234).get(), 1234);
        assert_eq!(Port::DIRECTOR_DEFAULT.get(), 8080);
    }
}
