//! Distributed File Storage Library
//!
//! This library crate defines the core modules of a chunked, replicated file store.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of five core subsystems plus the caller that drives them:
//!
//! - **`chunker`**: The chunk codec. Splits byte streams into fixed-size, content-addressed
//!   chunks and reassembles them atomically in index order.
//! - **`health`**: The liveness layer. A background task probes every configured node in
//!   parallel and publishes consistent snapshots for request handlers to read.
//! - **`placement`**: The replica placement policy. Samples distinct healthy nodes for each
//!   chunk and turns per-node upload outcomes into a complete / partial / failed verdict.
//! - **`storage`**: The storage node. Persists chunk payloads and descriptors on local disk
//!   and serves them over HTTP.
//! - **`registry`**: The metadata server. Durable file -> chunk placement records, read-path
//!   resolution filtered through liveness, and best-effort deletes.
//! - **`client`**: Upload, download and management flows against a running cluster.
//!
//! Shared pieces: `config` (cluster configuration), `error` (the error taxonomy and its
//! HTTP mapping) and `persist` (atomic writes and path-safe identifiers).

pub mod chunker;
pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod persist;
pub mod placement;
pub mod registry;
pub mod storage;

#[cfg(test)]
mod testing;
