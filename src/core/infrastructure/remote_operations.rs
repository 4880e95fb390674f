//! The GridServer admin operations the exporter calls.

use crate::core::{
    domain::{
        error::{ExporterError, ExporterResult},
        model::{call_result::CallResult, soap_connection::SoapConnection},
    },
    infrastructure::{
        http_transport::HttpTransport,
        soap_envelope::{
            SoapBody, SoapRequest, SoapResponse, XmlElement, decode_response, encode_request,
        },
    },
};
use serde::Serialize;
use std::str::FromStr;

/// An admin service endpoint: the service name and its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminEndpoint {
    service: &'static str,
    url: String,
}

impl AdminEndpoint {
    /// `BrokerAdmin` on the Director.
    pub fn broker_admin(director_url: &str) -> Self {
        Self::new("BrokerAdmin", format!("{}/BrokerAdmin", director_url))
    }

    /// `ManagerAdmin` on the Director, which reports grid-wide totals.
    pub fn manager_admin(director_url: &str) -> Self {
        Self::new("ManagerAdmin", format!("{}/ManagerAdmin", director_url))
    }

    /// `ServiceAdmin` on a Broker, which reports that Broker only.
    pub fn service_admin(broker_base_url: &str) -> Self {
        Self::new(
            "ServiceAdmin",
            format!(
                "{}/webservices/ServiceAdmin",
                broker_base_url.trim_end_matches('/')
            ),
        )
    }

    fn new(service: &'static str, url: String) -> Self {
        Self { service, url }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Broker details as reported by `BrokerAdmin.getAllBrokerInfo`.
///
/// Routing properties are part of the response but not kept. Missing and nil
/// fields take their zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BrokerInfo {
    pub base_url: String,
    pub broker_id: i64,
    pub busy_engine_count: u64,
    pub driver_count: u64,
    pub driver_weight: f64,
    pub engine_count: u64,
    pub engine_weight: f64,
    pub failover: bool,
    pub hostname: String,
    pub max_engines: u64,
    pub min_engines: u64,
    pub min_idle_home_engines: u64,
    pub name: String,
}

impl BrokerInfo {
    fn from_element(element: &XmlElement) -> ExporterResult<Self> {
        Ok(Self {
            base_url: text_field(element, "baseUrl"),
            broker_id: number_field(element, "brokerId")?,
            busy_engine_count: number_field(element, "busyEngineCount")?,
            driver_count: number_field(element, "driverCount")?,
            driver_weight: number_field(element, "driverWeight")?,
            engine_count: number_field(element, "engineCount")?,
            engine_weight: number_field(element, "engineWeight")?,
            failover: bool_field(element, "failover")?,
            hostname: text_field(element, "hostname"),
            max_engines: number_field(element, "maxEngines")?,
            min_engines: number_field(element, "minEngines")?,
            min_idle_home_engines: number_field(element, "minIdleHomeEngines")?,
            name: text_field(element, "name"),
        })
    }
}

fn text_field(element: &XmlElement, name: &str) -> String {
    element
        .child(name)
        .filter(|c| !c.nil)
        .map(|c| c.text.trim().to_string())
        .unwrap_or_default()
}

fn number_field<T>(element: &XmlElement, name: &str) -> ExporterResult<T>
where
    T: FromStr + Default,
    T::Err: std::fmt::Display,
{
    let text = text_field(element, name);
    if text.is_empty() {
        return Ok(T::default());
    }
    text.parse().map_err(|e| {
        ExporterError::Decode(format!("invalid value {:?} for {}: {}", text, name, e))
    })
}

/// Reads an `xsd:boolean`, which allows `1` and `0` besides the literals.
fn bool_field(element: &XmlElement, name: &str) -> ExporterResult<bool> {
    match text_field(element, name).as_str() {
        "" | "false" | "0" => Ok(false),
        "true" | "1" => Ok(true),
        other => Err(ExporterError::Decode(format!(
            "invalid value {:?} for {}: expected a boolean",
            other, name
        ))),
    }
}

/// Request for `getAllBrokerInfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetAllBrokerInfo;

/// Response of `getAllBrokerInfo`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetAllBrokerInfoResponse {
    pub broker_infos: Vec<BrokerInfo>,
}

impl SoapRequest for GetAllBrokerInfo {
    const ELEMENT: &'static str = "getAllBrokerInfo";
    type Response = GetAllBrokerInfoResponse;
}

impl SoapResponse for GetAllBrokerInfoResponse {
    const ELEMENT: &'static str = "getAllBrokerInfoResponse";

    fn from_payload(payload: &XmlElement) -> ExporterResult<Self> {
        let broker_infos = payload
            .children_named("getAllBrokerInfoReturn")
            .map(BrokerInfo::from_element)
            .collect::<ExporterResult<Vec<_>>>()?;
        Ok(Self { broker_infos })
    }
}

/// Defines a parameterless request answered with a single integer.
macro_rules! count_operation {
    ($request:ident, $response:ident, $element:literal) => {
        #[doc = concat!("Request for `", $element, "`.")]
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $request;

        #[doc = concat!("Response of `", $element, "`.")]
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $response {
            pub count: u64,
        }

        impl SoapRequest for $request {
            const ELEMENT: &'static str = $element;
            type Response = $response;
        }

        impl SoapResponse for $response {
            const ELEMENT: &'static str = concat!($element, "Response");

            fn from_payload(payload: &XmlElement) -> ExporterResult<Self> {
                Ok(Self {
                    count: number_field(payload, concat!($element, "Return"))?,
                })
            }
        }

        impl From<$response> for u64 {
            fn from(response: $response) -> u64 {
                response.count
            }
        }
    };
}

count_operation!(
    GetRunningServiceCount,
    GetRunningServiceCountResponse,
    "getRunningServiceCount"
);
count_operation!(
    GetRunningInvocationCount,
    GetRunningInvocationCountResponse,
    "getRunningInvocationCount"
);
count_operation!(
    GetPendingInvocationCount,
    GetPendingInvocationCountResponse,
    "getPendingInvocationCount"
);

/// Client for the GridServer admin web services.
///
/// Each operation is timed and its error, if any, is wrapped with the
/// qualified operation name, e.g. `ServiceAdmin.getRunningServiceCount`.
#[derive(Debug, Clone)]
pub struct SoapClient {
    transport: HttpTransport,
    director_url: String,
}

impl SoapClient {
    /// Creates a client for the Director described by `connection`.
    ///
    /// # Errors
    /// Returns `ExporterError::Request` if the HTTP client cannot be built.
    pub fn new(connection: &SoapConnection) -> ExporterResult<Self> {
        Ok(Self {
            transport: HttpTransport::new(connection)?,
            director_url: connection.director_url().to_string(),
        })
    }

    pub fn director_url(&self) -> &str {
        &self.director_url
    }

    /// Lists every Broker known to the Director.
    pub async fn get_all_broker_info(&self) -> CallResult<Vec<BrokerInfo>> {
        let endpoint = AdminEndpoint::broker_admin(&self.director_url);
        CallResult::timed(async {
            self.call(&endpoint, &GetAllBrokerInfo)
                .await
                .map(|response| response.broker_infos)
        })
        .await
    }

    /// Number of Services running on the given endpoint.
    pub async fn get_running_service_count(&self, endpoint: &AdminEndpoint) -> CallResult<u64> {
        self.count(endpoint, &GetRunningServiceCount).await
    }

    /// Number of tasks running on the given endpoint.
    pub async fn get_running_invocation_count(&self, endpoint: &AdminEndpoint) -> CallResult<u64> {
        self.count(endpoint, &GetRunningInvocationCount).await
    }

    /// Number of tasks waiting for an Engine on the given endpoint.
    pub async fn get_pending_invocation_count(&self, endpoint: &AdminEndpoint) -> CallResult<u64> {
        self.count(endpoint, &GetPendingInvocationCount).await
    }

    async fn count<R>(&self, endpoint: &AdminEndpoint, request: &R) -> CallResult<u64>
    where
        R: SoapRequest,
        R::Response: Into<u64>,
    {
        CallResult::timed(async { self.call(endpoint, request).await.map(Into::into) }).await
    }

    /// Sends one request and decodes its response; a fault becomes an error.
    async fn call<R: SoapRequest>(
        &self,
        endpoint: &AdminEndpoint,
        request: &R,
    ) -> ExporterResult<R::Response> {
        let operation = format!("{}.{}", endpoint.service(), R::ELEMENT);
        let result = async {
            let envelope = encode_request(request)?;
            let raw = self.transport.post(endpoint.url(), envelope).await?;
            match decode_response::<R::Response>(&raw)? {
                SoapBody::Payload(response) => Ok(response),
                SoapBody::Fault(fault) => Err(ExporterError::Fault(fault)),
            }
        }
        .await;
        result.map_err(|e| e.in_operation(operation))
    }
}
