//! Normalized cluster and node reports.
//!
//! Every data source reduces its own view of the grid into these structs.
//! Activity counters a source or collection mode cannot provide are `None`;
//! the exporter skips them instead of rendering a zero.

use crate::core::domain::error::{ExporterError, ExporterResult};
use serde::Serialize;

/// A snapshot of the current state of one Broker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeSummary {
    /// Broker name as configured on the Director.
    pub name: String,
    /// Host name taken from the Broker base URL.
    pub hostname: String,
    /// Number of Engines busy.
    pub busy_engines: u64,
    /// Number of Engines logged in.
    pub total_engines: u64,
    /// Number of Drivers logged in.
    pub drivers: u64,
    /// Number of Services running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services_running: Option<u64>,
    /// Number of tasks running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_running: Option<u64>,
    /// Number of tasks pending (not yet assigned to Engines).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_pending: Option<u64>,
    /// Time since Broker start in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_minutes: Option<f64>,
}

impl NodeSummary {
    /// Creates a summary carrying only identity and capacity counters.
    pub fn new(
        name: impl Into<String>,
        hostname: impl Into<String>,
        busy_engines: u64,
        total_engines: u64,
        drivers: u64,
    ) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
            busy_engines,
            total_engines,
            drivers,
            ..Default::default()
        }
    }
}

/// A snapshot of the current state of the entire grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub busy_engines: u64,
    pub total_engines: u64,
    pub drivers: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services_running: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_running: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_pending: Option<u64>,
}

impl ClusterSummary {
    /// Sums the capacity counters of every node.
    ///
    /// Activity counters are left uncollected; see [`ClusterSummary::sum_activity`].
    ///
    /// # Errors
    /// Returns `ExporterError::Decode` if a total does not fit in a `u64`.
    pub fn from_capacity(nodes: &[NodeSummary]) -> ExporterResult<Self> {
        Ok(Self {
            busy_engines: checked_sum("busy engines", nodes.iter().map(|n| n.busy_engines))?,
            total_engines: checked_sum("total engines", nodes.iter().map(|n| n.total_engines))?,
            drivers: checked_sum("drivers", nodes.iter().map(|n| n.drivers))?,
            ..Default::default()
        })
    }

    /// Sums the node activity counters into the cluster.
    ///
    /// A counter stays `None` if any node lacks it, so a partially collected
    /// counter never reads as a smaller total.
    ///
    /// # Errors
    /// Returns `ExporterError::Decode` if a total does not fit in a `u64`.
    pub fn sum_activity(&mut self, nodes: &[NodeSummary]) -> ExporterResult<()> {
        self.services_running =
            sum_collected("services running", nodes.iter().map(|n| n.services_running))?;
        self.tasks_running = sum_collected("tasks running", nodes.iter().map(|n| n.tasks_running))?;
        self.tasks_pending = sum_collected("tasks pending", nodes.iter().map(|n| n.tasks_pending))?;
        Ok(())
    }
}

fn checked_sum(counter: &str, mut values: impl Iterator<Item = u64>) -> ExporterResult<u64> {
    values
        .try_fold(0u64, |total, value| total.checked_add(value))
        .ok_or_else(|| ExporterError::Decode(format!("{} total overflows", counter)))
}

fn sum_collected(
    counter: &str,
    values: impl Iterator<Item = Option<u64>>,
) -> ExporterResult<Option<u64>> {
    let values: Option<Vec<u64>> = values.collect();
    values
        .map(|values| checked_sum(counter, values.into_iter()))
        .transpose()
}

/// The result of one collection cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub cluster: ClusterSummary,
    pub nodes: Vec<NodeSummary>,
}
