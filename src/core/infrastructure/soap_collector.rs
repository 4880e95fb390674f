//! Collects grid snapshots through the GridServer Web Services API.

use crate::core::{
    application::data_source::DataSource,
    domain::{
        error::ExporterResult,
        model::{
            call_result::CallResult,
            soap_connection::SoapConnection,
            source_options::CollectionMode,
            summary::{ClusterSummary, NodeSummary, Snapshot},
        },
    },
    infrastructure::remote_operations::{AdminEndpoint, BrokerInfo, SoapClient},
};
use async_trait::async_trait;
use tracing::debug;
use url::Url;

/// Builds snapshots from `BrokerAdmin` plus either per-Broker `ServiceAdmin`
/// calls or Director-level `ManagerAdmin` calls.
///
/// All calls of a cycle run one after the other and the first failure aborts
/// the cycle.
#[derive(Debug)]
pub struct SoapCollector {
    client: SoapClient,
    director_hostname: String,
    mode: CollectionMode,
}

impl SoapCollector {
    /// Creates a collector for the given Director connection.
    ///
    /// # Errors
    /// Returns `ExporterError::Request` if the HTTP client cannot be built.
    pub fn new(connection: &SoapConnection) -> ExporterResult<Self> {
        Ok(Self {
            client: SoapClient::new(connection)?,
            director_hostname: connection.host().as_str().to_string(),
            mode: connection.mode(),
        })
    }

    pub fn mode(&self) -> CollectionMode {
        self.mode
    }

    async fn collect(&self) -> ExporterResult<Snapshot> {
        let hostname = self.director_hostname.as_str();

        let (result, elapsed) = self.client.get_all_broker_info().await.into_parts();
        let broker_infos = match result {
            Ok(infos) => infos,
            Err(e) => {
                debug!(?elapsed, hostname, error = %e, "BrokerAdmin.getAllBrokerInfo failed");
                return Err(e);
            }
        };
        debug!(
            ?elapsed,
            hostname,
            brokers = broker_infos.len(),
            "BrokerAdmin.getAllBrokerInfo succeeded"
        );

        let mut nodes = Vec::with_capacity(broker_infos.len());
        for info in &broker_infos {
            let mut node = seed_node(info);
            if self.mode == CollectionMode::PerNode {
                self.collect_node_activity(info, &mut node).await?;
            }
            nodes.push(node);
        }

        let mut cluster = ClusterSummary::from_capacity(&nodes)?;
        match self.mode {
            CollectionMode::PerNode => cluster.sum_activity(&nodes)?,
            CollectionMode::DirectorOnly => self.collect_grid_activity(&mut cluster).await?,
        }

        Ok(Snapshot { cluster, nodes })
    }

    async fn collect_node_activity(
        &self,
        info: &BrokerInfo,
        node: &mut NodeSummary,
    ) -> ExporterResult<()> {
        let endpoint = AdminEndpoint::service_admin(&info.base_url);
        let log = |call: &str, result: CallResult<u64>| -> ExporterResult<u64> {
            let (result, elapsed) = result.into_parts();
            match &result {
                Ok(count) => debug!(
                    ?elapsed,
                    hostname = %node.hostname,
                    name = %node.name,
                    count,
                    "ServiceAdmin.{} succeeded",
                    call
                ),
                Err(e) => debug!(
                    ?elapsed,
                    hostname = %node.hostname,
                    name = %node.name,
                    error = %e,
                    "ServiceAdmin.{} failed",
                    call
                ),
            }
            result
        };

        let services_running = log(
            "getRunningServiceCount",
            self.client.get_running_service_count(&endpoint).await,
        )?;
        let tasks_running = log(
            "getRunningInvocationCount",
            self.client.get_running_invocation_count(&endpoint).await,
        )?;
        let tasks_pending = log(
            "getPendingInvocationCount",
            self.client.get_pending_invocation_count(&endpoint).await,
        )?;

        node.services_running = Some(services_running);
        node.tasks_running = Some(tasks_running);
        node.tasks_pending = Some(tasks_pending);
        Ok(())
    }

    async fn collect_grid_activity(&self, cluster: &mut ClusterSummary) -> ExporterResult<()> {
        let endpoint = AdminEndpoint::manager_admin(self.client.director_url());
        let hostname = self.director_hostname.as_str();
        let log = |call: &str, result: CallResult<u64>| -> ExporterResult<u64> {
            let (result, elapsed) = result.into_parts();
            match &result {
                Ok(count) => debug!(?elapsed, hostname, count, "ManagerAdmin.{} succeeded", call),
                Err(e) => debug!(?elapsed, hostname, error = %e, "ManagerAdmin.{} failed", call),
            }
            result
        };

        let services_running = log(
            "getRunningServiceCount",
            self.client.get_running_service_count(&endpoint).await,
        )?;
        let tasks_running = log(
            "getRunningInvocationCount",
            self.client.get_running_invocation_count(&endpoint).await,
        )?;
        let tasks_pending = log(
            "getPendingInvocationCount",
            self.client.get_pending_invocation_count(&endpoint).await,
        )?;

        cluster.services_running = Some(services_running);
        cluster.tasks_running = Some(tasks_running);
        cluster.tasks_pending = Some(tasks_pending);
        Ok(())
    }
}

#[async_trait]
impl DataSource for SoapCollector {
    fn kind(&self) -> &'static str {
        "soap"
    }

    async fn fetch(&self) -> ExporterResult<Snapshot> {
        self.collect().await
    }
}

/// Seeds a node from its Broker info; activity counters start uncollected.
fn seed_node(info: &BrokerInfo) -> NodeSummary {
    NodeSummary::new(
        info.name.clone(),
        node_hostname(&info.base_url),
        info.busy_engine_count,
        info.engine_count,
        info.driver_count,
    )
}

/// Host name of a Broker base URL, empty if it cannot be parsed.
pub(crate) fn node_hostname(base_url: &str) -> String {
    Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_default()
}
