//! Health Tracking Module
//!
//! Keeps a best-effort view of which storage nodes are reachable. A background task
//! probes every configured node in parallel on a fixed interval and publishes the
//! results; request handlers only ever read consistent snapshots.
//!
//! ## Staleness
//! A node reported healthy was reachable within the last `check_interval` plus one probe
//! timeout. Callers must still handle a "healthy" node failing at use time.

pub mod monitor;
pub mod types;

pub use monitor::{HealthMonitor, ProbeFn, http_probe};
pub use types::{HealthSnapshot, NodeId, NodeInfo, NodeStatus};
