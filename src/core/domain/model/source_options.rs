//! Options shared by every data source.

use std::time::Duration;

/// Where the per-Broker activity counters come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectionMode {
    /// Ask every Broker for its services and tasks (O(n) calls).
    #[default]
    PerNode,
    /// Ask only the Director for grid-wide totals (O(1) calls).
    DirectorOnly,
}

/// Settings that accompany the connection URI.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Verify TLS certificates of the Web Services endpoint.
    pub tls_verify: bool,
    /// Bound on each individual remote call.
    pub timeout: Duration,
    /// Schema of the reporting database; each driver has its own default.
    pub schema: Option<String>,
    pub mode: CollectionMode,
    /// Makes mock data reproducible.
    pub mock_seed: Option<u64>,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            tls_verify: true,
            timeout: Duration::from_secs(5),
            schema: None,
            mode: CollectionMode::PerNode,
            mock_seed: None,
        }
    }
}
