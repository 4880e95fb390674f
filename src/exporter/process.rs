//! Process metrics for a process identified by a PID file.

use crate::core::domain::error::ExporterResult;
use prometheus::{
    core::{Collector, Desc},
    process_collector::ProcessCollector,
    proto::MetricFamily,
};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::metrics::NAMESPACE;

/// Reports `gridserver_process_*` metrics for the PID found in a file.
///
/// The file is read at every collection, so a restarted GridServer process
/// is picked up without restarting the exporter. A missing or unreadable
/// file yields no process metrics.
pub struct PidFileCollector {
    path: PathBuf,
    descriptions: ProcessCollector,
}

impl PidFileCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            descriptions: ProcessCollector::new(0, NAMESPACE),
        }
    }
}

impl Collector for PidFileCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descriptions.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        match read_pid(&self.path) {
            Ok(pid) => ProcessCollector::new(pid, NAMESPACE).collect(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Reading PID file failed");
                Vec::new()
            }
        }
    }
}

/// Reads a PID from a file holding a single decimal number.
pub(crate) fn read_pid(path: &Path) -> ExporterResult<i32> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        prometheus::Error::Msg(format!("cannot read {}: {}", path.display(), e))
    })?;
    let pid = content.trim().parse().map_err(|e| {
        prometheus::Error::Msg(format!(
            "invalid PID {:?} in {}: {}",
            content.trim(),
            path.display(),
            e
        ))
    })?;
    Ok(pid)
}
