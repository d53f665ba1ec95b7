use crate::health::NodeId;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Descriptor of a registered file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDescriptor {
    pub file_id: String,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub total_chunks: u32,
    /// Unix milliseconds.
    pub created_at: u64,
    /// Unix milliseconds; bumped by every chunk registration.
    pub updated_at: u64,
}

/// Where one chunk of a file lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub chunk_id: String,
    pub file_id: String,
    pub index: u32,
    pub size: u64,
    /// Never empty once registered.
    pub nodes: Vec<NodeId>,
}

/// Durable record of a file: its descriptor plus the full chunk map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub file: FileDescriptor,
    #[serde(default)]
    pub chunks: BTreeMap<u32, ChunkDescriptor>,
}

impl FileRecord {
    pub fn new(file: FileDescriptor) -> Self {
        Self {
            file,
            chunks: BTreeMap::new(),
        }
    }

    /// All chunk indices `0..total_chunks` have a location.
    pub fn is_complete(&self) -> bool {
        (0..self.file.total_chunks).all(|index| self.chunks.contains_key(&index))
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            file_id: self.file.file_id.clone(),
            filename: self.file.filename.clone(),
            size: self.file.size,
            total_chunks: self.file.total_chunks,
            registered_chunks: self.chunks.len() as u32,
            created_at: self.file.created_at,
        }
    }
}

/// Row of the file listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSummary {
    pub file_id: String,
    pub filename: String,
    pub size: u64,
    pub total_chunks: u32,
    pub registered_chunks: u32,
    pub created_at: u64,
}

/// File registration as received on the wire. Required fields are optional here so
/// their absence is reported as a validation error instead of a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileRegistration {
    pub file_id: Option<String>,
    pub filename: Option<String>,
    pub total_chunks: Option<u32>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Chunk registration as received on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkRegistration {
    pub file_id: Option<String>,
    pub chunk_id: Option<String>,
    pub index: Option<u32>,
    #[serde(default)]
    pub size: Option<u64>,
    pub nodes: Option<Vec<NodeId>>,
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
