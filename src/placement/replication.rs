use crate::health::NodeId;

/// Result of pushing one chunk to one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOutcome {
    pub node_id: NodeId,
    pub result: Result<(), String>,
}

impl NodeOutcome {
    pub fn success(node_id: NodeId) -> Self {
        Self {
            node_id,
            result: Ok(()),
        }
    }

    pub fn failure(node_id: NodeId, reason: impl Into<String>) -> Self {
        Self {
            node_id,
            result: Err(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Aggregate verdict over a chunk's fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationDecision {
    /// Every requested replica was stored.
    Complete { nodes: Vec<NodeId> },
    /// At least one replica, but fewer than requested. Still registered.
    Partial { nodes: Vec<NodeId>, requested: usize },
    /// No node accepted the chunk. Must not be registered.
    Failed { requested: usize },
}

impl ReplicationDecision {
    /// Nodes that now hold the chunk, in outcome order.
    pub fn stored_on(&self) -> &[NodeId] {
        match self {
            ReplicationDecision::Complete { nodes } | ReplicationDecision::Partial { nodes, .. } => {
                nodes
            }
            ReplicationDecision::Failed { .. } => &[],
        }
    }

    pub fn achieved(&self) -> usize {
        self.stored_on().len()
    }

    /// Whether the chunk should be registered.
    pub fn is_stored(&self) -> bool {
        !matches!(self, ReplicationDecision::Failed { .. })
    }
}

/// Pure decision over the per-node outcomes of one chunk upload. Duplicate successes
/// for the same node are counted once.
pub fn decide(outcomes: &[NodeOutcome], requested: usize) -> ReplicationDecision {
    let mut nodes: Vec<NodeId> = Vec::new();
    for outcome in outcomes.iter().filter(|outcome| outcome.is_success()) {
        if !nodes.contains(&outcome.node_id) {
            nodes.push(outcome.node_id.clone());
        }
    }

    if nodes.is_empty() {
        ReplicationDecision::Failed { requested }
    } else if nodes.len() < requested {
        ReplicationDecision::Partial { nodes, requested }
    } else {
        ReplicationDecision::Complete { nodes }
    }
}
