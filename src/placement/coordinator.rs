use crate::error::{Result, StorageError};
use crate::health::{HealthMonitor, NodeInfo};

use rand::Rng;
use rand::seq::SliceRandom;
use std::sync::Arc;

pub struct PlacementCoordinator {
    health: Arc<HealthMonitor>,
    replication_factor: usize,
}

impl PlacementCoordinator {
    pub fn new(health: Arc<HealthMonitor>, replication_factor: usize) -> Self {
        Self {
            health,
            replication_factor,
        }
    }

    /// Configured number of replicas per chunk.
    pub fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    /// Picks `replicas` distinct healthy nodes.
    pub fn select_targets(&self, replicas: usize) -> Result<Vec<NodeInfo>> {
        self.select_targets_with_rng(replicas, &mut rand::thread_rng())
    }

    pub fn select_targets_with_rng<R: Rng + ?Sized>(
        &self,
        replicas: usize,
        rng: &mut R,
    ) -> Result<Vec<NodeInfo>> {
        let healthy = self.health.healthy_nodes();
        let targets = choose_targets(&healthy, replicas, rng)?;

        tracing::debug!(
            "Selected {:?} as targets ({} healthy node(s))",
            targets.iter().map(|n| n.node_id.as_str()).collect::<Vec<_>>(),
            healthy.len()
        );

        Ok(targets)
    }
}

/// Uniform sample of `replicas` distinct nodes from `healthy`.
pub fn choose_targets<R: Rng + ?Sized>(
    healthy: &[NodeInfo],
    replicas: usize,
    rng: &mut R,
) -> Result<Vec<NodeInfo>> {
    if replicas == 0 {
        return Err(StorageError::InvalidDescriptor(
            "replication factor must be at least 1".to_string(),
        ));
    }

    if healthy.len() < replicas {
        tracing::warn!(
            "Not enough healthy nodes. Need {}, have {}",
            replicas,
            healthy.len()
        );
        return Err(StorageError::InsufficientHealthyNodes {
            required: replicas,
            available: healthy.len(),
        });
    }

    Ok(healthy.choose_multiple(rng, replicas).cloned().collect())
}
