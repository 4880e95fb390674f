use crate::core::{
    application::data_source::DataSource,
    domain::{
        error::{ExporterResult, ValidationError},
        model::{
            soap_connection::SoapConnection, source_options::SourceOptions,
            sql_connection::SqlConnection,
        },
        value_object::ConnectionUri,
    },
    infrastructure::{
        mock_collector::MockCollector, soap_collector::SoapCollector, sql_collector::SqlCollector,
    },
};
use tracing::{debug, info};

/// Picks the data source for a connection URI.
///
/// | Scheme | Source |
/// |--------|--------|
/// | `http`, `https` | Web Services API |
/// | `postgres`, `postgresql`, `mssql`, `sqlserver`, `ora`, `oracle` | reporting database |
/// | `mock` | random data |
///
/// The URI is fully validated before anything is returned and no network or
/// database connection is opened.
///
/// # Errors
/// Returns a validation error for unsupported schemes and for URIs the
/// selected source rejects.
///
/// # Examples
/// ```
/// use gridserver_exporter::{DataSource, SourceOptions, select_source};
///
/// let source = select_source("mock://", &SourceOptions::default()).unwrap();
/// assert_eq!(source.kind(), "mock");
///
/// let error = select_source("gopher://director", &SourceOptions::default()).err().unwrap();
/// assert_eq!(error.to_string(), "Validation error: unsupported scheme: \"gopher\"");
/// ```
pub fn select_source(uri: &str, options: &SourceOptions) -> ExporterResult<Box<dyn DataSource>> {
    let uri = ConnectionUri::parse(uri)?;

    match uri.scheme() {
        "http" | "https" => {
            let connection = SoapConnection::from_uri(&uri, options)?;
            let collector = SoapCollector::new(&connection).inspect_err(|e| {
                debug!(error = %e, "SOAP client creation failed");
            })?;
            info!(
                url = %uri.redacted(),
                host = connection.host().as_str(),
                port = connection.port().get(),
                tls_verify = options.tls_verify,
                timeout = ?options.timeout,
                mode = ?options.mode,
                "Using Web Services API"
            );
            Ok(Box::new(collector))
        }
        "postgres" | "postgresql" | "mssql" | "sqlserver" | "ora" | "oracle" => {
            let connection = SqlConnection::from_uri(&uri, options)?;
            let collector = SqlCollector::new(&connection).inspect_err(|e| {
                debug!(error = %e, "SQL client creation failed");
            })?;
            info!(
                url = %uri.redacted(),
                driver = %connection.driver(),
                schema = connection.schema(),
                "Using reporting database"
            );
            Ok(Box::new(collector))
        }
        "mock" => {
            info!("Using mock data");
            Ok(Box::new(MockCollector::new(options.mock_seed)))
        }
        other => Err(ValidationError::ConstraintViolation(format!(
            "unsupported scheme: {:?}",
            other
        ))
        .into()),
    }
}
