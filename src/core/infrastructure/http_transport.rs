//! HTTP transport for SOAP calls against the Director and Brokers.

use crate::core::domain::{
    error::{ExporterError, ExporterResult, TimeoutReason},
    model::soap_connection::SoapConnection,
    value_object::{Password, Username},
};
use reqwest::{Client, header::CONTENT_TYPE};
use std::{error::Error as StdError, time::Duration};
use tracing::trace;

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=\"utf-8\"";
const USER_AGENT: &str = concat!("gridserver-exporter/", env!("CARGO_PKG_VERSION"));
const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(90);
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_millis(10);

/// Posts SOAP envelopes with HTTP basic authentication.
///
/// One transport is shared by every call of every collection cycle so that
/// idle connections to the Director and Brokers are reused. The connect
/// timeout is the configured timeout and the whole request gets a slightly
/// longer budget so that connection failures report as such.
///
/// The HTTP status code is not inspected: Axis reports faults with status 500
/// and a SOAP body, and anything else is caught by envelope decoding.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: Client,
    username: Username,
    password: Password,
}

impl HttpTransport {
    /// Creates a transport for the given connection.
    ///
    /// # Errors
    /// Returns `ExporterError::Request` if the HTTP client cannot be built.
    pub fn new(connection: &SoapConnection) -> ExporterResult<Self> {
        let http_client = Client::builder()
            .danger_accept_invalid_certs(!connection.tls_verify())
            .connect_timeout(connection.timeout())
            .timeout(connection.timeout() + REQUEST_TIMEOUT_MARGIN)
            .pool_idle_timeout(IDLE_CONNECTION_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ExporterError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            username: connection.username().clone(),
            password: connection.password().clone(),
        })
    }

    /// Posts an envelope to `endpoint` and returns the raw response body.
    ///
    /// # Errors
    /// - `ExporterError::Transport` if no response was received, with the
    ///   timeout reason when one can be determined
    /// - `ExporterError::ResponseRead` if the body could not be read
    pub async fn post(&self, endpoint: &str, envelope: Vec<u8>) -> ExporterResult<Vec<u8>> {
        trace!(endpoint, request = %String::from_utf8_lossy(&envelope), "SOAP request");

        let response = self
            .http_client
            .post(endpoint)
            .basic_auth(self.username.as_str(), Some(self.password.as_str()))
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header("SOAPAction", "")
            .body(envelope)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ExporterError::ResponseRead(e.to_string()))?;

        trace!(
            endpoint,
            status = status.as_u16(),
            response = %String::from_utf8_lossy(&body),
            "SOAP response"
        );
        Ok(body.to_vec())
    }
}

fn transport_error(error: reqwest::Error) -> ExporterError {
    if error.is_builder() {
        return ExporterError::Request(error_chain(&error));
    }
    let reason = error.is_timeout().then(|| timeout_reason(&error));
    let message = match reason {
        Some(reason) => format!("{}: {}", reason, error),
        None => error.to_string(),
    };
    ExporterError::Transport { message, reason }
}

/// Renders an error with its causes, e.g. `builder error: relative URL without a base`.
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message = format!("{}: {}", message, cause);
        source = cause.source();
    }
    message
}

fn timeout_reason(error: &reqwest::Error) -> TimeoutReason {
    classify_timeout(error.source(), error.is_connect())
}

/// Best-effort classification of a timeout.
///
/// `DnsLookup` is only reported when the resolver itself failed and left
/// its error in the source chain. A lookup that is still pending when the
/// connect timeout fires carries no such error and reports as `Connect`.
fn classify_timeout(
    mut source: Option<&(dyn StdError + 'static)>,
    is_connect: bool,
) -> TimeoutReason {
    while let Some(cause) = source {
        let text = cause.to_string().to_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return TimeoutReason::DnsLookup;
        }
        source = cause.source();
    }
    if is_connect {
        TimeoutReason::Connect
    } else {
        TimeoutReason::Request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{
        model::source_options::CollectionMode,
        value_object::{Host, Port},
    };
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{basic_auth, header, header_exists, method, path},
    };

    fn create_test_connection(server_url: &str, timeout: Duration) -> SoapConnection {
        SoapConnection::new(
            Host::new_unchecked("127.0.0.1".to_string()),
            Port::DIRECTOR_DEFAULT,
            Username::new_unchecked("admin".to_string()),
            Password::new_unchecked("secret".to_string()),
            server_url.to_string(),
            true,
            timeout,
            CollectionMode::PerNode,
        )
    }

    #[tokio::test]
    async fn test_post_sends_soap_headers() {
        let mock_server = MockServer::start().await;
        let connection = create_test_connection(&mock_server.uri(), Duration::from_secs(5));
        let transport = HttpTransport::new(&connection).unwrap();

        Mock::given(method("POST"))
            .and(path("/livecluster/webservices/BrokerAdmin"))
            .and(basic_auth("admin", "secret"))
            .and(header("content-type", SOAP_CONTENT_TYPE))
            .and(header("user-agent", USER_AGENT))
            .and(header_exists("soapaction"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<ok/>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let endpoint = format!("{}/livecluster/webservices/BrokerAdmin", mock_server.uri());
        let body = transport.post(&endpoint, b"<request/>".to_vec()).await.unwrap();
        assert_eq!(body, b"<ok/>");
    }

    #[tokio::test]
    async fn test_status_code_is_ignored() {
        let mock_server = MockServer::start().await;
        let connection = create_test_connection(&mock_server.uri(), Duration::from_secs(5));
        let transport = HttpTransport::new(&connection).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<fault/>"))
            .mount(&mock_server)
            .await;

        let body = transport
            .post(&mock_server.uri(), Vec::new())
            .await
            .unwrap();
        assert_eq!(body, b"<fault/>");
    }

    #[tokio::test]
    async fn test_empty_body_is_returned_as_is() {
        let mock_server = MockServer::start().await;
        let connection = create_test_connection(&mock_server.uri(), Duration::from_secs(5));
        let transport = HttpTransport::new(&connection).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let body = transport
            .post(&mock_server.uri(), Vec::new())
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;
        let connection = create_test_connection(&mock_server.uri(), Duration::from_millis(100));
        let transport = HttpTransport::new(&connection).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&mock_server)
            .await;

        let result = transport.post(&mock_server.uri(), Vec::new()).await;
        match result {
            Err(ExporterError::Transport { reason, message }) => {
                assert_eq!(reason, Some(TimeoutReason::Request));
                assert!(message.starts_with("Request timed out"));
            }
            other => panic!("expected transport timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let connection = create_test_connection("http://127.0.0.1:1", Duration::from_secs(1));
        let transport = HttpTransport::new(&connection).unwrap();

        let result = transport.post("http://127.0.0.1:1/", Vec::new()).await;
        let error = result.unwrap_err();
        assert!(matches!(error, ExporterError::Transport { .. }));
        assert!(error.to_string().starts_with("HTTP request failed"));
    }

    #[tokio::test]
    async fn test_unparseable_endpoint_is_request_error() {
        let connection = create_test_connection("http://127.0.0.1:1", Duration::from_secs(1));
        let transport = HttpTransport::new(&connection).unwrap();

        let error = transport
            .post("not a url/webservices/ServiceAdmin", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(error, ExporterError::Request(_)), "{:?}", error);
        assert!(error.to_string().starts_with("HTTP request creation failed: builder error"));
    }

    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct Cause {
        message: &'static str,
        #[source]
        source: Option<Box<Cause>>,
    }

    fn chain(messages: &[&'static str]) -> Cause {
        messages
            .iter()
            .rev()
            .fold(None::<Cause>, |source, message| {
                Some(Cause {
                    message: *message,
                    source: source.map(Box::new),
                })
            })
            .unwrap()
    }

    #[test]
    fn test_classify_timeout() {
        let resolver = chain(&[
            "client error (Connect)",
            "dns error",
            "failed to lookup address information",
        ]);
        assert_eq!(classify_timeout(Some(&resolver), true), TimeoutReason::DnsLookup);

        let connect = chain(&["client error (Connect)", "operation timed out"]);
        assert_eq!(classify_timeout(Some(&connect), true), TimeoutReason::Connect);
        assert_eq!(classify_timeout(None, true), TimeoutReason::Connect);
        assert_eq!(classify_timeout(None, false), TimeoutReason::Request);
    }

    #[test]
    fn test_error_chain() {
        let error = chain(&["builder error", "relative URL without a base"]);
        assert_eq!(error_chain(&error), "builder error: relative URL without a base");
    }
}
