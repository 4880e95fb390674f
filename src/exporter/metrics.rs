//! Gauges for the cluster and per-Broker summaries.

use crate::core::domain::{
    error::ExporterResult,
    model::summary::{ClusterSummary, NodeSummary},
};
use prometheus::{GaugeVec, Opts, Registry};

pub(crate) const NAMESPACE: &str = "gridserver";

const NO_LABELS: &[&str] = &[];
const BROKER_LABELS: &[&str] = &["name", "hostname"];

fn gauge_vec(subsystem: &str, name: &str, help: &str, labels: &[&str]) -> ExporterResult<GaugeVec> {
    let opts = Opts::new(name, help)
        .namespace(NAMESPACE)
        .subsystem(subsystem);
    Ok(GaugeVec::new(opts, labels)?)
}

/// Grid-wide gauges.
///
/// They carry no labels but are vectors so that a reset removes them from
/// the output until the next successful cycle sets them.
#[derive(Clone)]
pub(crate) struct GridMetrics {
    busy_engines: GaugeVec,
    total_engines: GaugeVec,
    drivers: GaugeVec,
    services_running: GaugeVec,
    tasks_running: GaugeVec,
    tasks_pending: GaugeVec,
}

impl GridMetrics {
    pub(crate) fn new() -> ExporterResult<Self> {
        let gauge = |name: &str, help: &str| gauge_vec("grid", name, help, NO_LABELS);
        Ok(Self {
            busy_engines: gauge("busy_engines", "Number of Engines busy.")?,
            total_engines: gauge("total_engines", "Number of Engines logged in.")?,
            drivers: gauge("drivers", "Number of Drivers logged in.")?,
            services_running: gauge("services_running", "Number of Services running.")?,
            tasks_running: gauge("tasks_running", "Number of tasks running.")?,
            tasks_pending: gauge(
                "tasks_pending",
                "Number of tasks pending (not yet assigned to Engines).",
            )?,
        })
    }

    fn all(&self) -> [&GaugeVec; 6] {
        [
            &self.busy_engines,
            &self.total_engines,
            &self.drivers,
            &self.services_running,
            &self.tasks_running,
            &self.tasks_pending,
        ]
    }

    pub(crate) fn register(&self, registry: &Registry) -> ExporterResult<()> {
        for gauge in self.all() {
            registry.register(Box::new(gauge.clone()))?;
        }
        Ok(())
    }

    pub(crate) fn reset(&self) {
        self.all().iter().for_each(|gauge| gauge.reset());
    }

    pub(crate) fn set(&self, cluster: &ClusterSummary) {
        let set = |gauge: &GaugeVec, value: u64| {
            gauge.with_label_values(NO_LABELS).set(value as f64);
        };
        set(&self.busy_engines, cluster.busy_engines);
        set(&self.total_engines, cluster.total_engines);
        set(&self.drivers, cluster.drivers);
        if let Some(value) = cluster.services_running {
            set(&self.services_running, value);
        }
        if let Some(value) = cluster.tasks_running {
            set(&self.tasks_running, value);
        }
        if let Some(value) = cluster.tasks_pending {
            set(&self.tasks_pending, value);
        }
    }
}

/// Per-Broker gauges labelled with the Broker name and host name.
#[derive(Clone)]
pub(crate) struct BrokerMetrics {
    busy_engines: GaugeVec,
    total_engines: GaugeVec,
    drivers: GaugeVec,
    services_running: GaugeVec,
    tasks_running: GaugeVec,
    tasks_pending: GaugeVec,
    uptime_minutes: GaugeVec,
}

impl BrokerMetrics {
    pub(crate) fn new() -> ExporterResult<Self> {
        let gauge = |name: &str, help: &str| gauge_vec("broker", name, help, BROKER_LABELS);
        Ok(Self {
            busy_engines: gauge("busy_engines", "Number of Engines busy.")?,
            total_engines: gauge("total_engines", "Number of Engines logged in.")?,
            drivers: gauge("drivers", "Number of Drivers logged in.")?,
            services_running: gauge("services_running", "Number of Services running.")?,
            tasks_running: gauge("tasks_running", "Number of tasks running.")?,
            tasks_pending: gauge(
                "tasks_pending",
                "Number of tasks pending (not yet assigned to Engines).",
            )?,
            uptime_minutes: gauge("uptime_minutes", "Time since Broker start in minutes.")?,
        })
    }

    fn all(&self) -> [&GaugeVec; 7] {
        [
            &self.busy_engines,
            &self.total_engines,
            &self.drivers,
            &self.services_running,
            &self.tasks_running,
            &self.tasks_pending,
            &self.uptime_minutes,
        ]
    }

    pub(crate) fn register(&self, registry: &Registry) -> ExporterResult<()> {
        for gauge in self.all() {
            registry.register(Box::new(gauge.clone()))?;
        }
        Ok(())
    }

    pub(crate) fn reset(&self) {
        self.all().iter().for_each(|gauge| gauge.reset());
    }

    pub(crate) fn set(&self, node: &NodeSummary) {
        let labels = [node.name.as_str(), node.hostname.as_str()];
        let set = |gauge: &GaugeVec, value: f64| gauge.with_label_values(&labels).set(value);

        set(&self.busy_engines, node.busy_engines as f64);
        set(&self.total_engines, node.total_engines as f64);
        set(&self.drivers, node.drivers as f64);
        if let Some(value) = node.services_running {
            set(&self.services_running, value as f64);
        }
        if let Some(value) = node.tasks_running {
            set(&self.tasks_running, value as f64);
        }
        if let Some(value) = node.tasks_pending {
            set(&self.tasks_pending, value as f64);
        }
        if let Some(value) = node.uptime_minutes {
            set(&self.uptime_minutes, value);
        }
    }
}
