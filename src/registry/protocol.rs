//! Metadata Server Protocol
//!
//! Endpoints served by the metadata server and the bodies exchanged with it.

use super::types::*;
use crate::health::{NodeInfo, NodeStatus};

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

pub const ENDPOINT_REGISTER_FILE: &str = "/register_file";
pub const ENDPOINT_REGISTER_CHUNK: &str = "/register_chunk";
/// `GET /get_upload_locations?replicas=N`
pub const ENDPOINT_UPLOAD_LOCATIONS: &str = "/get_upload_locations";
/// `GET /get_file_info/{file_id}`
pub const ENDPOINT_FILE_INFO: &str = "/get_file_info";
pub const ENDPOINT_LIST_FILES: &str = "/list_files";
/// `GET /chunk_locations/{file_id}/{index}`
pub const ENDPOINT_CHUNK_LOCATIONS: &str = "/chunk_locations";
pub const ENDPOINT_NODE_STATUS: &str = "/node_status";
/// `DELETE /delete_file/{file_id}`
pub const ENDPOINT_DELETE_FILE: &str = "/delete_file";

// --- Data Transfer Objects ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadLocationsQuery {
    pub replicas: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadLocationsResponse {
    pub status: String,
    pub nodes: Vec<NodeInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterFileResponse {
    pub status: String,
    pub file: FileDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterChunkResponse {
    pub status: String,
    pub chunk: ChunkDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfoResponse {
    pub status: String,
    pub file: FileDescriptor,
    pub chunks: Vec<ChunkDescriptor>,
}

impl From<FileRecord> for FileInfoResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            status: "success".to_string(),
            file: record.file,
            chunks: record.chunks.into_values().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFilesResponse {
    pub status: String,
    pub files: Vec<FileSummary>,
}

/// Healthy replicas of one chunk, in the order they were recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkLocationsResponse {
    pub chunk_id: String,
    pub index: u32,
    pub size: u64,
    pub nodes: Vec<NodeInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusResponse {
    pub status: String,
    pub nodes: Vec<NodeStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteFileResponse {
    pub status: String,
    pub file_id: String,
    pub replicas_deleted: usize,
    /// Replicas that could not be removed and are left on their node.
    pub replicas_failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerHealthResponse {
    pub status: String,
    pub healthy_nodes: usize,
    pub total_nodes: usize,
}
