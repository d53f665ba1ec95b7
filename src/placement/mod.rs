//! Placement Module
//!
//! Chooses replica targets for a chunk from the currently healthy nodes and decides,
//! from the per-node upload outcomes, whether the chunk counts as stored.
//!
//! ## Policy
//! - **Selection**: `R` distinct healthy nodes sampled uniformly without replacement.
//!   Fewer than `R` healthy nodes fails immediately with `InsufficientHealthyNodes`.
//! - **Completion**: best effort. One accepted replica is enough to register the chunk;
//!   fewer than `R` is reported as partial replication. Zero accepted replicas is a hard
//!   failure and nothing is registered.

pub mod coordinator;
pub mod replication;

pub use coordinator::{PlacementCoordinator, choose_targets};
pub use replication::{NodeOutcome, ReplicationDecision, decide};

#[cfg(test)]
mod tests;
