//! Registry Module
//!
//! The metadata server: the authoritative mapping of files to chunk placement, and the
//! HTTP surface callers use to register uploads, resolve reads and delete files.
//!
//! ## Components
//! - **`Registry`** (`store.rs`): one durable JSON record per file (descriptor plus full
//!   chunk map), cached in memory and updated write-through.
//! - **`MetadataService`** (`service.rs`): combines the registry with the health view and
//!   the placement coordinator; filters chunk replicas through current liveness and
//!   fans out best-effort deletes to storage nodes.
//! - **Handlers** (`handlers.rs`): maps service results and `StorageError`s onto status
//!   codes and JSON bodies.

pub mod handlers;
pub mod protocol;
pub mod service;
pub mod store;
pub mod types;

pub use service::{MetadataService, healthy_candidates};
pub use store::Registry;
pub use types::{ChunkDescriptor, FileDescriptor, FileRecord, FileSummary};
