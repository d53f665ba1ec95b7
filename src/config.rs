//! Cluster configuration.
//!
//! Resolved in three layers, later ones winning:
//! 1. Built-in defaults (three local nodes, replication factor 2, 1 MiB chunks)
//! 2. An optional TOML file
//! 3. `DFS_*` environment variables
//!
//! Command-line flags are applied on top by the binary.

use crate::chunker::DEFAULT_CHUNK_SIZE;
use crate::health::NodeInfo;
use crate::storage::handlers::MAX_CHUNK_SIZE;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusterConfig {
    /// Static list of storage nodes.
    pub nodes: Vec<NodeInfo>,
    /// Base URL of the metadata server.
    pub metadata_url: String,
    /// Interface servers bind to; the port comes from the node or metadata URL.
    pub bind_host: String,
    pub replication_factor: usize,
    pub chunk_size: usize,
    pub check_interval_secs: u64,
    pub probe_timeout_secs: u64,
    /// Chunk store/retrieve calls.
    pub transfer_timeout_secs: u64,
    /// Metadata calls and node-side deletes.
    pub request_timeout_secs: u64,
    /// Registry records.
    pub metadata_dir: PathBuf,
    /// Parent of every node's chunk directory (`<storage_dir>/<node_id>`).
    pub storage_dir: PathBuf,
    pub download_dir: PathBuf,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: (1..=3)
                .map(|i| NodeInfo::new(format!("node{}", i), format!("http://localhost:{}", 5000 + i)))
                .collect(),
            metadata_url: "http://localhost:5000".to_string(),
            bind_host: "0.0.0.0".to_string(),
            replication_factor: 2,
            chunk_size: DEFAULT_CHUNK_SIZE,
            check_interval_secs: 30,
            probe_timeout_secs: 5,
            transfer_timeout_secs: 30,
            request_timeout_secs: 5,
            metadata_dir: PathBuf::from("data/metadata"),
            storage_dir: PathBuf::from("data/storage"),
            download_dir: PathBuf::from("downloads"),
        }
    }
}

impl ClusterConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                tracing::debug!("Loading config from {:?}", path);
                let contents = std::fs::read_to_string(path)?;
                toml::from_str(&contents)?
            }
            None => ClusterConfig::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies `DFS_*` overrides read through `lookup`. Unparsable numbers are ignored
    /// with a warning.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DFS_METADATA_URL") {
            self.metadata_url = url;
        }
        override_number(&lookup, "DFS_REPLICATION_FACTOR", &mut self.replication_factor);
        override_number(&lookup, "DFS_CHUNK_SIZE", &mut self.chunk_size);
        override_number(&lookup, "DFS_CHECK_INTERVAL_SECS", &mut self.check_interval_secs);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replication_factor == 0 {
            return Err(ConfigError::Invalid(
                "replication_factor must be at least 1".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be at least 1".to_string()));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::Invalid(format!(
                "chunk_size {} exceeds the {} byte limit of a store request",
                self.chunk_size, MAX_CHUNK_SIZE
            )));
        }
        if self.check_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "check_interval_secs must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(&node.node_id) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate node id {}",
                    node.node_id
                )));
            }
        }

        if self.replication_factor > self.nodes.len() {
            tracing::warn!(
                "Replication factor {} exceeds the {} configured node(s); uploads will fail",
                self.replication_factor,
                self.nodes.len()
            );
        }
        Ok(())
    }

    pub fn node(&self, node_id: &str) -> Option<&NodeInfo> {
        self.nodes.iter().find(|node| node.node_id.as_str() == node_id)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn node_storage_dir(&self, node_id: &str) -> PathBuf {
        self.storage_dir.join(node_id)
    }

    /// `bind_host:port`, with the port taken from `url`.
    pub fn listen_addr(&self, url: &str) -> Result<String, ConfigError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ConfigError::Invalid(format!("invalid url {:?}: {}", url, e)))?;
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| ConfigError::Invalid(format!("url {:?} has no port", url)))?;
        Ok(format!("{}:{}", self.bind_host, port))
    }

    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&ClusterConfig::default())
    }
}

fn override_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!("Ignoring {}={:?}: not a number", key, raw),
    }
}
