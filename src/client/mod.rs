//! Client Module
//!
//! Drives the write and read paths end to end:
//!
//! - **Upload**: split the file, register it, then for each chunk ask the metadata
//!   server for `R` targets, push the chunk to all of them concurrently and register
//!   the nodes that accepted it.
//! - **Download**: resolve each index to its healthy replicas, fetch from the first
//!   one that answers with the right content, then reassemble.
//!
//! Per-node failures are logged and absorbed; only whole-operation failures surface as
//! errors.

pub mod service;
pub mod transport;
pub mod types;

pub use service::StorageClient;
pub use transport::{MetadataClient, NodeClient};
pub use types::{ChunkUploadReport, DownloadReport, UploadReport};
