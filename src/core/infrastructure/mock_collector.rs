//! Generates random grid snapshots for trying out dashboards and alerts.

use crate::core::{
    application::data_source::DataSource,
    domain::{
        error::ExporterResult,
        model::summary::{ClusterSummary, NodeSummary, Snapshot},
    },
};
use async_trait::async_trait;
use rand::{Rng, SeedableRng, rngs::StdRng};

const NODE_COUNT: usize = 5;

/// Produces five Brokers with random but plausible counters.
///
/// Without a seed every fetch is different; with a seed every fetch returns
/// the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct MockCollector {
    seed: Option<u64>,
}

impl MockCollector {
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    fn generate(&self) -> ExporterResult<Snapshot> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let nodes: Vec<NodeSummary> = (1..=NODE_COUNT)
            .map(|i| {
                let total_engines = 10_000 + rng.gen_range(0..100);
                let mut node = NodeSummary::new(
                    format!("BROKER_NAME_{}", i),
                    format!("broker{}.example.com", i),
                    rng.gen_range(0..total_engines),
                    total_engines,
                    rng.gen_range(0..10),
                );
                node.services_running = Some(rng.gen_range(0..50));
                node.tasks_pending = Some(rng.gen_range(0..100_000));
                node.uptime_minutes = Some(f64::from(rng.gen_range(0..10_000u32)));
                node
            })
            .collect();

        let mut cluster = ClusterSummary::from_capacity(&nodes)?;
        cluster.sum_activity(&nodes)?;
        cluster.tasks_running = Some(cluster.busy_engines);

        Ok(Snapshot { cluster, nodes })
    }
}

#[async_trait]
impl DataSource for MockCollector {
    fn kind(&self) -> &'static str {
        "mock"
    }

    async fn fetch(&self) -> ExporterResult<Snapshot> {
        self.generate()
    }
}
