use crate::core::domain::{error::ExporterResult, model::summary::Snapshot};
use async_trait::async_trait;

/// A source of grid snapshots.
///
/// Every call to [`DataSource::fetch`] is an independent collection cycle:
/// nothing is cached between calls and a failed cycle leaves the source ready
/// for the next one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short name of the back end, used in logs.
    fn kind(&self) -> &'static str;

    /// Runs one collection cycle.
    ///
    /// # Errors
    /// Returns the first error encountered; no partial snapshot is produced.
    async fn fetch(&self) -> ExporterResult<Snapshot>;
}
