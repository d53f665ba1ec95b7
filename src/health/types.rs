use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A configured storage node. The node list is static configuration; liveness is
/// tracked separately by the `HealthMonitor`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NodeInfo {
    #[serde(alias = "id")]
    pub node_id: NodeId,
    /// Base URL, e.g. `http://localhost:5001`.
    pub url: String,
}

impl NodeInfo {
    pub fn new(node_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            node_id: NodeId(node_id.into()),
            url: url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Joins an endpoint path onto the node's base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), path)
    }
}

/// Node entry as reported by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeStatus {
    pub node_id: NodeId,
    pub url: String,
    pub healthy: bool,
}

/// Immutable copy of the node → liveness mapping taken at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthSnapshot {
    statuses: HashMap<NodeId, bool>,
}

impl HealthSnapshot {
    pub fn new(statuses: HashMap<NodeId, bool>) -> Self {
        Self { statuses }
    }

    /// Unknown nodes count as unhealthy.
    pub fn is_healthy(&self, node_id: &NodeId) -> bool {
        self.statuses.get(node_id).copied().unwrap_or(false)
    }

    pub fn healthy_count(&self) -> usize {
        self.statuses.values().filter(|healthy| **healthy).count()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, bool)> {
        self.statuses.iter().map(|(id, healthy)| (id, *healthy))
    }
}
