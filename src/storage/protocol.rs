//! Storage Node Protocol
//!
//! Endpoints and DTOs a storage node serves. Chunk payloads travel base64-encoded
//! inside JSON bodies.

use super::store::ChunkMetadata;
use crate::error::{Result, StorageError};
use crate::health::NodeId;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Store a chunk (`POST`, `201` on success).
pub const ENDPOINT_STORE: &str = "/store";
/// Fetch a chunk by id (`GET /retrieve/{chunk_id}`).
pub const ENDPOINT_RETRIEVE: &str = "/retrieve";
/// Inventory of the node's chunks.
pub const ENDPOINT_LIST: &str = "/list";
/// Remove a chunk by id (`DELETE /delete/{chunk_id}`).
pub const ENDPOINT_DELETE: &str = "/delete";

// --- Data Transfer Objects ---

/// Body of a store request. Fields are optional on the wire so that a missing
/// field is answered with `400` and an error payload.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreChunkRequest {
    pub chunk_id: Option<String>,
    pub file_id: Option<String>,
    pub index: Option<u32>,
    /// Declared payload size; checked against the decoded data when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Base64-encoded payload.
    pub data: Option<String>,
}

/// A validated store request.
#[derive(Debug)]
pub struct StoreChunk {
    pub chunk_id: String,
    pub file_id: String,
    pub index: u32,
    pub data: Vec<u8>,
}

impl StoreChunkRequest {
    pub fn new(chunk_id: &str, file_id: &str, index: u32, data: &[u8]) -> Self {
        Self {
            chunk_id: Some(chunk_id.to_string()),
            file_id: Some(file_id.to_string()),
            index: Some(index),
            size: Some(data.len() as u64),
            data: Some(encode_payload(data)),
        }
    }

    pub fn validate(self) -> Result<StoreChunk> {
        let chunk_id = self.chunk_id.ok_or(StorageError::MissingField("chunk_id"))?;
        let file_id = self.file_id.ok_or(StorageError::MissingField("file_id"))?;
        let index = self.index.ok_or(StorageError::MissingField("index"))?;
        let encoded = self.data.ok_or(StorageError::MissingField("data"))?;

        let data = decode_payload(&encoded)?;
        if let Some(size) = self.size
            && size != data.len() as u64
        {
            return Err(StorageError::InvalidDescriptor(format!(
                "declared size {} does not match payload size {}",
                size,
                data.len()
            )));
        }

        Ok(StoreChunk {
            chunk_id,
            file_id,
            index,
            data,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreChunkResponse {
    pub status: String,
    pub message: String,
    pub node_id: NodeId,
    pub chunk_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetrieveChunkResponse {
    pub status: String,
    /// Base64-encoded payload.
    pub data: String,
    pub metadata: ChunkMetadata,
    pub node_id: NodeId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListChunksResponse {
    pub status: String,
    pub node_id: NodeId,
    pub chunks: Vec<ChunkMetadata>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteChunkResponse {
    pub status: String,
    pub message: String,
    pub node_id: NodeId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeHealthResponse {
    pub status: String,
    pub node_id: NodeId,
}

pub fn encode_payload(data: &[u8]) -> String {
    B64.encode(data)
}

pub fn decode_payload(encoded: &str) -> Result<Vec<u8>> {
    B64.decode(encoded)
        .map_err(|e| StorageError::InvalidDescriptor(format!("data is not valid base64: {}", e)))
}
