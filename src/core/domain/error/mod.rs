use crate::core::domain::model::soap_fault::SoapFault;
use std::fmt;
use thiserror::Error;

/// The main error type for exporter operations.
///
/// Configuration problems surface as [`ExporterError::Validation`] while the
/// exporter is being built. Everything else is raised while a collection cycle
/// runs and aborts that cycle only.
#[derive(Error, Debug)]
pub enum ExporterError {
    /// Represents invalid or incomplete configuration
    ///
    /// # Fields
    /// * `source` - The underlying validation error
    #[error("Validation error: {source}")]
    Validation { source: ValidationError },

    /// The HTTP request could not be built
    #[error("HTTP request creation failed: {0}")]
    Request(String),

    /// The HTTP exchange failed before a response arrived
    ///
    /// # Fields
    /// * `message` - Description of the transport failure
    /// * `reason` - Best-effort classification of timeouts
    #[error("HTTP request failed: {message}")]
    Transport {
        message: String,
        reason: Option<TimeoutReason>,
    },

    /// The response body could not be read
    #[error("HTTP response body read failed: {0}")]
    ResponseRead(String),

    /// The server answered with zero bytes
    #[error("received empty response from server")]
    EmptyResponse,

    /// The outbound envelope could not be serialized
    #[error("SOAP request encoding failed: {0}")]
    Encode(String),

    /// The response is not a well-formed SOAP envelope
    #[error("received invalid SOAP response: {0}")]
    MalformedEnvelope(String),

    /// The envelope is valid but its payload is not the expected response
    #[error("SOAP payload decoding failed: {0}")]
    Decode(String),

    /// The remote service answered with a SOAP fault
    #[error("{}", .0.string)]
    Fault(SoapFault),

    /// A remote operation failed
    ///
    /// # Fields
    /// * `operation` - Qualified operation name, e.g. `BrokerAdmin.getAllBrokerInfo`
    /// * `source` - The failure that aborted the operation
    #[error("{operation} failed: {source}")]
    Operation {
        operation: String,
        source: Box<ExporterError>,
    },

    /// Reporting database failures
    #[error("Database error: {0}")]
    Database(String),

    /// Metric registration or encoding failures
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl ExporterError {
    /// Wraps this error with the name of the operation it aborted.
    pub(crate) fn in_operation(self, operation: impl Into<String>) -> Self {
        ExporterError::Operation {
            operation: operation.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error of an operation chain.
    pub fn root_cause(&self) -> &ExporterError {
        match self {
            ExporterError::Operation { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns the SOAP fault that caused this error, if any.
    pub fn fault(&self) -> Option<&SoapFault> {
        match self.root_cause() {
            ExporterError::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    /// Returns true for configuration errors detected at construction time.
    pub fn is_validation(&self) -> bool {
        matches!(self, ExporterError::Validation { .. })
    }
}

impl From<ValidationError> for ExporterError {
    fn from(error: ValidationError) -> Self {
        ExporterError::Validation { source: error }
    }
}

/// Specialized error type for validation failures.
///
/// This enum provides detailed context about why a validation
/// failed, including field-specific errors and format violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Represents a validation failure for a specific field
    ///
    /// # Fields
    /// * `field` - The name of the field that failed validation
    /// * `message` - A detailed message about why validation failed
    #[error("Field '{field}' validation failed: {message}")]
    Field { field: String, message: String },

    /// Represents format/syntax validation failures
    ///
    /// # Fields
    /// * `0` - Description of the format violation
    #[error("Format error: {0}")]
    Format(String),

    /// Represents violations of domain constraints
    ///
    /// # Fields
    /// * `0` - Description of the constraint violation
    #[error("{0}")]
    ConstraintViolation(String),
}

/// Why a transport-level timeout fired, when it can be told apart.
///
/// Dropped UDP packets make DNS lookups time out without any address in the
/// error, whereas connection timeouts happen against a resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutReason {
    DnsLookup,
    Connect,
    Request,
}

impl fmt::Display for TimeoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutReason::DnsLookup => f.write_str("DNS lookup timed out"),
            TimeoutReason::Connect => f.write_str("Connection timed out"),
            TimeoutReason::Request => f.write_str("Request timed out"),
        }
    }
}

/// Type alias for Results that may fail with an ExporterError
pub type ExporterResult<T> = Result<T, ExporterError>;
