use super::types::*;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Liveness endpoint exposed by every service.
pub const ENDPOINT_HEALTHCHECK: &str = "/healthcheck";

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Type-erased liveness probe: resolves to `true` if the node answered successfully.
pub type ProbeFn =
    Arc<dyn Fn(NodeInfo) -> Pin<Box<dyn Future<Output = bool> + Send>> + Send + Sync>;

/// Probe issuing `GET {url}/healthcheck`; only a `200` counts as healthy.
pub fn http_probe(client: reqwest::Client, timeout: Duration) -> ProbeFn {
    Arc::new(move |node: NodeInfo| {
        let client = client.clone();
        Box::pin(async move {
            let response = client
                .get(node.endpoint(ENDPOINT_HEALTHCHECK))
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => resp.status() == reqwest::StatusCode::OK,
                Err(e) => {
                    tracing::debug!("Health probe to {} failed: {}", node.node_id, e);
                    false
                }
            }
        }) as Pin<Box<dyn Future<Output = bool> + Send>>
    })
}

struct MonitorTask {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Tracks node liveness. Constructed explicitly and shared by `Arc`; the owner of the
/// process decides when monitoring starts and stops.
pub struct HealthMonitor {
    nodes: Vec<NodeInfo>,
    check_interval: Duration,
    probe_timeout: Duration,
    status: RwLock<HashMap<NodeId, bool>>,
    probe: ProbeFn,
    cycles: AtomicU64,
    task: Mutex<Option<MonitorTask>>,
}

impl HealthMonitor {
    /// Monitor probing nodes over HTTP.
    pub fn new(nodes: Vec<NodeInfo>, check_interval: Duration, probe_timeout: Duration) -> Arc<Self> {
        let probe = http_probe(reqwest::Client::new(), probe_timeout);
        Self::with_probe(nodes, check_interval, probe_timeout, probe)
    }

    pub fn with_probe(
        nodes: Vec<NodeInfo>,
        check_interval: Duration,
        probe_timeout: Duration,
        probe: ProbeFn,
    ) -> Arc<Self> {
        // Nothing is routed to a node before its first successful probe.
        let status = nodes
            .iter()
            .map(|node| (node.node_id.clone(), false))
            .collect();

        Arc::new(Self {
            nodes,
            check_interval,
            probe_timeout,
            status: RwLock::new(status),
            probe,
            cycles: AtomicU64::new(0),
            task: Mutex::new(None),
        })
    }

    pub fn nodes(&self) -> &[NodeInfo] {
        &self.nodes
    }

    pub fn node(&self, node_id: &NodeId) -> Option<&NodeInfo> {
        self.nodes.iter().find(|node| &node.node_id == node_id)
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Number of probe cycles applied so far.
    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|task| !task.handle.is_finished())
            .unwrap_or(false)
    }

    /// Starts the background probe loop. Returns `false` if it was already running.
    pub fn start_monitoring(self: &Arc<Self>) -> bool {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = task.as_ref()
            && !existing.handle.is_finished()
        {
            tracing::debug!("Health monitoring already running");
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let monitor = Arc::clone(self);
        let handle = tokio::spawn(async move {
            monitor.monitor_loop(stop_rx).await;
        });

        *task = Some(MonitorTask { stop_tx, handle });

        tracing::info!(
            "Health monitoring started for {} node(s) every {:?}",
            self.nodes.len(),
            self.check_interval
        );
        true
    }

    /// Signals the probe loop to stop and waits for the current cycle to finish.
    /// Returns `false` if monitoring was not running.
    pub async fn stop_monitoring(&self) -> bool {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(mut task) = task else {
            return false;
        };
        if task.handle.is_finished() {
            return false;
        }

        let _ = task.stop_tx.send(true);
        match tokio::time::timeout(STOP_TIMEOUT, &mut task.handle).await {
            Ok(_) => tracing::info!("Health monitoring stopped"),
            Err(_) => {
                tracing::warn!(
                    "Health monitoring did not stop within {:?}, aborting",
                    STOP_TIMEOUT
                );
                task.handle.abort();
            }
        }
        true
    }

    async fn monitor_loop(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        loop {
            self.check_all_nodes().await;

            tokio::select! {
                _ = tokio::time::sleep(self.check_interval) => {}
                _ = stop_rx.changed() => break,
            }
        }
    }

    /// Runs one probe cycle: every node is probed in parallel, each under its own
    /// timeout, and the results are published together.
    pub async fn check_all_nodes(&self) -> HealthSnapshot {
        let mut probes = JoinSet::new();
        for node in &self.nodes {
            let probe = self.probe.clone();
            let node = node.clone();
            let timeout = self.probe_timeout;
            probes.spawn(async move {
                let node_id = node.node_id.clone();
                let healthy = tokio::time::timeout(timeout, probe(node))
                    .await
                    .unwrap_or(false);
                (node_id, healthy)
            });
        }

        // A probe that panics leaves its node unhealthy.
        let mut results: HashMap<NodeId, bool> = self
            .nodes
            .iter()
            .map(|node| (node.node_id.clone(), false))
            .collect();
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((node_id, healthy)) => {
                    results.insert(node_id, healthy);
                }
                Err(e) => tracing::warn!("Health probe task failed: {}", e),
            }
        }

        self.apply_cycle(results);
        self.snapshot()
    }

    fn apply_cycle(&self, results: HashMap<NodeId, bool>) {
        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);

        for (node_id, healthy) in results {
            let previous = status.insert(node_id.clone(), healthy);
            match (previous, healthy) {
                (Some(false), true) => tracing::info!("Node {} is healthy", node_id),
                (Some(true), false) => tracing::warn!("Node {} became unhealthy", node_id),
                _ => tracing::trace!("Node {} healthy={}", node_id, healthy),
            }
        }

        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(
            "Health cycle {} complete: {}/{} node(s) healthy",
            cycle,
            status.values().filter(|healthy| **healthy).count(),
            status.len()
        );
    }

    pub fn is_healthy(&self, node_id: &NodeId) -> bool {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(node_id)
            .copied()
            .unwrap_or(false)
    }

    /// Healthy nodes in configuration order.
    pub fn healthy_nodes(&self) -> Vec<NodeInfo> {
        let status = self.status.read().unwrap_or_else(PoisonError::into_inner);
        self.nodes
            .iter()
            .filter(|node| status.get(&node.node_id).copied().unwrap_or(false))
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot::new(
            self.status
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        )
    }

    pub fn node_statuses(&self) -> Vec<NodeStatus> {
        let snapshot = self.snapshot();
        self.nodes
            .iter()
            .map(|node| NodeStatus {
                node_id: node.node_id.clone(),
                url: node.url.clone(),
                healthy: snapshot.is_healthy(&node.node_id),
            })
            .collect()
    }
}
