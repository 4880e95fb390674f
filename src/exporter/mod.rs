//! Prometheus exporter driven by a [`DataSource`].
//!
//! Every scrape runs one collection cycle. The metrics of the previous cycle
//! are cleared first, so a failed cycle exports only `gridserver_up 0` and
//! the scrape counters.

mod metrics;
#[cfg(target_os = "linux")]
pub mod process;
pub mod server;

use crate::core::{
    application::data_source::DataSource,
    domain::{
        error::{ExporterError, ExporterResult},
        model::{call_result::round_millis, summary::Snapshot},
    },
};
use metrics::{BrokerMetrics, GridMetrics, NAMESPACE};
use prometheus::{
    Encoder, Gauge, GaugeVec, IntCounter, Opts, Registry, TextEncoder, proto::MetricFamily,
};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Collects grid metrics on demand and renders them in the Prometheus text
/// format.
///
/// Scrapes are serialized: a scrape arriving while another one runs waits
/// for it to finish and then runs its own cycle.
pub struct Exporter {
    source: Box<dyn DataSource>,
    registry: Registry,
    scrape_lock: Mutex<()>,
    up: Gauge,
    total_scrapes: IntCounter,
    failed_scrapes: IntCounter,
    grid: GridMetrics,
    brokers: BrokerMetrics,
}

impl Exporter {
    /// Creates an exporter with its own registry.
    ///
    /// # Errors
    /// Returns `ExporterError::Metrics` if a metric cannot be registered.
    pub fn new(source: Box<dyn DataSource>) -> ExporterResult<Self> {
        let registry = Registry::new();

        let up = Gauge::with_opts(
            Opts::new("up", "Was the last scrape of GridServer successful.").namespace(NAMESPACE),
        )?;
        let total_scrapes = IntCounter::with_opts(
            Opts::new("exporter_total_scrapes", "Total number of GridServer scrapes.")
                .namespace(NAMESPACE),
        )?;
        let failed_scrapes = IntCounter::with_opts(
            Opts::new("exporter_failed_scrapes", "Number of failed GridServer scrapes.")
                .namespace(NAMESPACE),
        )?;
        let build_info = GaugeVec::new(
            Opts::new(
                "exporter_build_info",
                "A metric with a constant '1' value labeled by the exporter version.",
            )
            .namespace(NAMESPACE),
            &["version"],
        )?;
        build_info
            .with_label_values(&[env!("CARGO_PKG_VERSION")])
            .set(1.0);

        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(total_scrapes.clone()))?;
        registry.register(Box::new(failed_scrapes.clone()))?;
        registry.register(Box::new(build_info))?;

        let grid = GridMetrics::new()?;
        grid.register(&registry)?;
        let brokers = BrokerMetrics::new()?;
        brokers.register(&registry)?;

        Ok(Self {
            source,
            registry,
            scrape_lock: Mutex::new(()),
            up,
            total_scrapes,
            failed_scrapes,
            grid,
            brokers,
        })
    }

    /// Adds `gridserver_process_*` metrics for the process whose PID is
    /// written in `pidfile`. The file is read again at every scrape.
    ///
    /// # Errors
    /// Returns `ExporterError::Metrics` if the collector cannot be registered.
    #[cfg(target_os = "linux")]
    pub fn with_pidfile(self, pidfile: impl Into<std::path::PathBuf>) -> ExporterResult<Self> {
        let collector = process::PidFileCollector::new(pidfile);
        self.registry.register(Box::new(collector))?;
        Ok(self)
    }

    /// The registry the exporter reports into.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs one collection cycle and gathers every registered metric.
    ///
    /// A failed cycle is not an error: it is logged and reported through
    /// `gridserver_up` and `gridserver_exporter_failed_scrapes`.
    pub async fn scrape(&self) -> Vec<MetricFamily> {
        let _guard = self.scrape_lock.lock().await;

        self.grid.reset();
        self.brokers.reset();
        self.total_scrapes.inc();

        let start = Instant::now();
        let result = self.source.fetch().await;
        let elapsed = round_millis(start.elapsed());

        match result {
            Ok(snapshot) => {
                self.up.set(1.0);
                self.record(&snapshot);
                let cluster = &snapshot.cluster;
                info!(
                    ?elapsed,
                    brokers = snapshot.nodes.len(),
                    busy_engines = cluster.busy_engines,
                    total_engines = cluster.total_engines,
                    drivers = cluster.drivers,
                    services_running = ?cluster.services_running,
                    tasks_running = ?cluster.tasks_running,
                    tasks_pending = ?cluster.tasks_pending,
                    "Scrape succeeded"
                );
            }
            Err(e) => {
                self.up.set(0.0);
                self.failed_scrapes.inc();
                error!(?elapsed, source = self.source.kind(), error = %e, "Scrape failed");
            }
        }

        self.registry.gather()
    }

    /// Runs one collection cycle and renders the Prometheus text format.
    ///
    /// # Errors
    /// Returns `ExporterError::Metrics` if encoding fails.
    pub async fn render(&self) -> ExporterResult<String> {
        let families = self.scrape().await;
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| ExporterError::Metrics(prometheus::Error::Msg(e.to_string())))
    }

    /// Runs one collection cycle without touching the metrics.
    ///
    /// # Errors
    /// Returns the error of the failed cycle.
    pub async fn fetch_once(&self) -> ExporterResult<Snapshot> {
        let _guard = self.scrape_lock.lock().await;
        self.source.fetch().await
    }

    fn record(&self, snapshot: &Snapshot) {
        self.grid.set(&snapshot.cluster);
        for node in &snapshot.nodes {
            self.brokers.set(node);
            debug!(
                hostname = %node.hostname,
                name = %node.name,
                busy_engines = node.busy_engines,
                total_engines = node.total_engines,
                drivers = node.drivers,
                services_running = ?node.services_running,
                tasks_running = ?node.tasks_running,
                tasks_pending = ?node.tasks_pending,
                uptime_minutes = ?node.uptime_minutes,
                "Broker metrics processed"
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::{
        application::data_source::MockDataSource,
        domain::model::summary::{ClusterSummary, NodeSummary},
    };
    use std::collections::BTreeMap;

    /// Finds a sample in text output, matching labels in any order.
    pub(crate) fn sample(output: &str, metric: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let wanted: BTreeMap<&str, &str> = labels.iter().copied().collect();
        output
            .lines()
            .filter(|line| !line.starts_with('#'))
            .find_map(|line| {
                let (series, value) = line.rsplit_once(' ')?;
                let (name, found) = match series.split_once('{') {
                    Some((name, rest)) => {
                        let found: BTreeMap<&str, &str> = rest
                            .trim_end_matches('}')
                            .split(',')
                            .filter(|pair| !pair.is_empty())
                            .filter_map(|pair| {
                                let (key, value) = pair.split_once('=')?;
                                Some((key, value.trim_matches('"')))
                            })
                            .collect();
                        (name, found)
                    }
                    None => (series, BTreeMap::new()),
                };
                (name == metric && found == wanted).then(|| value.parse().ok())?
            })
    }

    fn snapshot() -> Snapshot {
        let mut node = NodeSummary::new("BROKER_1", "broker1.example.com", 3, 10, 2);
        node.tasks_running = Some(3);
        let mut cluster = ClusterSummary::from_capacity(std::slice::from_ref(&node)).unwrap();
        cluster.tasks_running = Some(3);
        Snapshot {
            cluster,
            nodes: vec![node],
        }
    }

    fn source(result: fn() -> ExporterResult<Snapshot>) -> Box<dyn DataSource> {
        let mut source = MockDataSource::new();
        source.expect_kind().return_const("mock");
        source.expect_fetch().returning(result);
        Box::new(source)
    }

    #[tokio::test]
    async fn test_successful_scrape() {
        let exporter = Exporter::new(source(|| Ok(snapshot()))).unwrap();
        let output = exporter.render().await.unwrap();

        assert_eq!(sample(&output, "gridserver_up", &[]), Some(1.0));
        assert_eq!(sample(&output, "gridserver_exporter_total_scrapes", &[]), Some(1.0));
        assert_eq!(sample(&output, "gridserver_exporter_failed_scrapes", &[]), Some(0.0));
        assert_eq!(sample(&output, "gridserver_grid_busy_engines", &[]), Some(3.0));
        assert_eq!(sample(&output, "gridserver_grid_tasks_running", &[]), Some(3.0));
        assert_eq!(
            sample(
                &output,
                "gridserver_broker_total_engines",
                &[("name", "BROKER_1"), ("hostname", "broker1.example.com")]
            ),
            Some(10.0)
        );
        assert_eq!(
            sample(
                &output,
                "gridserver_exporter_build_info",
                &[("version", env!("CARGO_PKG_VERSION"))]
            ),
            Some(1.0)
        );
    }

    #[tokio::test]
    async fn test_uncollected_values_are_not_rendered() {
        let exporter = Exporter::new(source(|| Ok(snapshot()))).unwrap();
        let output = exporter.render().await.unwrap();

        assert!(!output.contains("gridserver_grid_services_running "));
        assert!(!output.contains("gridserver_grid_tasks_pending "));
        assert!(!output.contains("gridserver_broker_uptime_minutes{"));
        assert!(!output.contains("gridserver_broker_services_running{"));
    }

    #[tokio::test]
    async fn test_failed_scrape_clears_previous_values() {
        let mut mock = MockDataSource::new();
        mock.expect_kind().return_const("mock");
        let mut seq = mockall::Sequence::new();
        mock.expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(snapshot()));
        mock.expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(ExporterError::EmptyResponse));
        let exporter = Exporter::new(Box::new(mock)).unwrap();

        let first = exporter.render().await.unwrap();
        assert_eq!(sample(&first, "gridserver_grid_total_engines", &[]), Some(10.0));

        let second = exporter.render().await.unwrap();
        assert_eq!(sample(&second, "gridserver_up", &[]), Some(0.0));
        assert_eq!(sample(&second, "gridserver_exporter_total_scrapes", &[]), Some(2.0));
        assert_eq!(sample(&second, "gridserver_exporter_failed_scrapes", &[]), Some(1.0));
        assert_eq!(sample(&second, "gridserver_grid_total_engines", &[]), None);
        assert!(!second.contains("gridserver_broker_busy_engines{"));
    }

    #[tokio::test]
    async fn test_fetch_once_leaves_metrics_untouched() {
        let exporter = Exporter::new(source(|| Ok(snapshot()))).unwrap();
        let snapshot = exporter.fetch_once().await.unwrap();
        assert_eq!(snapshot.nodes.len(), 1);

        let families = exporter.registry().gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(sample(&output, "gridserver_exporter_total_scrapes", &[]), Some(0.0));
    }

    #[test]
    fn test_sample_parser() {
        let output = "# HELP x y\nx{b=\"2\",a=\"1\"} 4\ny 5\n";
        assert_eq!(sample(output, "x", &[("a", "1"), ("b", "2")]), Some(4.0));
        assert_eq!(sample(output, "y", &[]), Some(5.0));
        assert_eq!(sample(output, "x", &[]), None);
    }
}
