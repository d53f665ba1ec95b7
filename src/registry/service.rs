use super::protocol::*;
use super::store::Registry;
use super::types::*;
use crate::error::{Result, StorageError};
use crate::health::{HealthMonitor, HealthSnapshot, NodeInfo, NodeStatus};
use crate::persist::blocking;
use crate::placement::PlacementCoordinator;
use crate::storage::protocol::ENDPOINT_DELETE;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// The metadata server: registry plus the liveness and placement views it routes with.
pub struct MetadataService {
    pub registry: Arc<Registry>,
    pub placement: PlacementCoordinator,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl MetadataService {
    pub fn new(
        registry: Registry,
        placement: PlacementCoordinator,
        request_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry: Arc::new(registry),
            placement,
            client: reqwest::Client::new(),
            request_timeout,
        })
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        self.placement.health()
    }

    /// Upload targets for one chunk. `replicas` defaults to the configured factor.
    pub fn upload_locations(&self, replicas: Option<usize>) -> Result<Vec<NodeInfo>> {
        let replicas = replicas.unwrap_or_else(|| self.placement.replication_factor());
        self.placement.select_targets(replicas)
    }

    /// Recorded replicas of a chunk that are currently healthy, in recorded order.
    pub fn chunk_locations(&self, file_id: &str, index: u32) -> Result<ChunkLocationsResponse> {
        let chunk = self.registry.resolve_chunk(file_id, index)?;
        let health = self.health();
        let candidates = healthy_candidates(&chunk, &health.snapshot(), health.nodes());

        if candidates.is_empty() {
            tracing::warn!(
                "No healthy replica for chunk {} of file {} (recorded on {:?})",
                index,
                file_id,
                chunk.nodes
            );
            return Err(StorageError::ChunkUnavailable {
                file_id: file_id.to_string(),
                index,
            });
        }

        Ok(ChunkLocationsResponse {
            chunk_id: chunk.chunk_id,
            index: chunk.index,
            size: chunk.size,
            nodes: candidates,
        })
    }

    pub fn node_status(&self) -> Vec<NodeStatus> {
        self.health().node_statuses()
    }

    /// Best-effort removal of every chunk replica from the healthy nodes holding it,
    /// followed by the registry delete. Node failures are logged and counted, never
    /// propagated; a node that is down keeps its copy.
    pub async fn delete_file(&self, file_id: &str) -> Result<DeleteFileResponse> {
        let registry = self.registry.clone();
        let id = file_id.to_string();
        let record = blocking(move || registry.get_file(&id)).await?;
        let health = self.health();
        let snapshot = health.snapshot();

        let mut deletions = JoinSet::new();
        for chunk in record.chunks.values() {
            for node in healthy_candidates(chunk, &snapshot, health.nodes()) {
                let client = self.client.clone();
                let timeout = self.request_timeout;
                let url = node.endpoint(&format!("{}/{}", ENDPOINT_DELETE, chunk.chunk_id));
                let chunk_id = chunk.chunk_id.clone();
                deletions.spawn(async move {
                    let result = client.delete(&url).timeout(timeout).send().await;
                    match result {
                        Ok(resp) if resp.status().is_success() => true,
                        Ok(resp) => {
                            tracing::warn!(
                                "Node {} refused to delete chunk {}: {}",
                                node.node_id,
                                chunk_id,
                                resp.status()
                            );
                            false
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Failed to delete chunk {} from {}: {}",
                                chunk_id,
                                node.node_id,
                                e
                            );
                            false
                        }
                    }
                });
            }
        }

        let mut deleted = 0usize;
        let mut failed = 0usize;
        while let Some(joined) = deletions.join_next().await {
            match joined {
                Ok(true) => deleted += 1,
                Ok(false) => failed += 1,
                Err(e) => {
                    tracing::warn!("Chunk deletion task failed: {}", e);
                    failed += 1;
                }
            }
        }

        let registry = self.registry.clone();
        let id = file_id.to_string();
        let removed = blocking(move || registry.delete_file(&id)).await?;

        tracing::info!(
            "Deleted file {}: {} replica(s) removed, {} left behind",
            file_id,
            deleted,
            failed
        );

        Ok(DeleteFileResponse {
            status: "success".to_string(),
            file_id: removed.file.file_id,
            replicas_deleted: deleted,
            replicas_failed: failed,
        })
    }
}

/// Nodes from `chunk.nodes` that are healthy in `snapshot`, resolved against the
/// configured node list. Recorded ids that are no longer configured are dropped.
pub fn healthy_candidates(
    chunk: &ChunkDescriptor,
    snapshot: &HealthSnapshot,
    nodes: &[NodeInfo],
) -> Vec<NodeInfo> {
    chunk
        .nodes
        .iter()
        .filter(|node_id| snapshot.is_healthy(node_id))
        .filter_map(|node_id| nodes.iter().find(|node| &node.node_id == node_id))
        .cloned()
        .collect()
}
