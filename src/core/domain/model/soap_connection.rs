use crate::core::domain::{
    error::ExporterResult,
    model::source_options::{CollectionMode, SourceOptions},
    value_object::{ConnectionUri, Host, Password, Port, ServicePath, Username},
};
use std::time::Duration;

/// Connection details for the GridServer Web Services API on the Director.
///
/// Built once at startup and never modified afterwards.
#[derive(Debug, Clone)]
pub struct SoapConnection {
    host: Host,
    port: Port,
    username: Username,
    password: Password,
    director_url: String,
    tls_verify: bool,
    timeout: Duration,
    mode: CollectionMode,
}

impl SoapConnection {
    /// Validates the URI and resolves the Director endpoint.
    ///
    /// # Errors
    /// Returns a validation error when the username, the password marker or
    /// the host is missing, or when the port is invalid.
    pub fn from_uri(uri: &ConnectionUri, options: &SourceOptions) -> ExporterResult<Self> {
        let username = uri.username()?;
        let password = uri.password()?;
        let host = uri.host()?;
        let port = uri.port()?.unwrap_or(Port::DIRECTOR_DEFAULT);
        let path = ServicePath::clean(uri.path());

        let director_url = format!(
            "{}://{}:{}{}",
            uri.scheme(),
            host.as_str(),
            port.get(),
            path.as_str()
        );

        Ok(Self::new(
            host,
            port,
            username,
            password,
            director_url,
            options.tls_verify,
            options.timeout,
            options.mode,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        host: Host,
        port: Port,
        username: Username,
        password: Password,
        director_url: String,
        tls_verify: bool,
        timeout: Duration,
        mode: CollectionMode,
    ) -> Self {
        Self {
            host,
            port,
            username,
            password,
            director_url,
            tls_verify,
            timeout,
            mode,
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn port(&self) -> Port {
        self.port
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn password(&self) -> &Password {
        &self.password
    }

    /// Base URL of the Director web services, without trailing slash.
    pub fn director_url(&self) -> &str {
        &self.director_url
    }

    pub fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn mode(&self) -> CollectionMode {
        self.mode
    }
}
