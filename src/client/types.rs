use crate::health::NodeId;
use crate::placement::ReplicationDecision;

use std::path::PathBuf;

/// Per-chunk outcome of an upload.
#[derive(Debug, Clone)]
pub struct ChunkUploadReport {
    pub index: u32,
    pub chunk_id: String,
    pub decision: ReplicationDecision,
    /// Nodes that were targeted but did not accept the chunk, with the reason.
    pub failures: Vec<(NodeId, String)>,
}

impl ChunkUploadReport {
    pub fn achieved(&self) -> usize {
        self.decision.achieved()
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.decision, ReplicationDecision::Partial { .. })
    }
}

/// What an upload achieved. Returned only when every chunk was stored on at least
/// one node.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub file_id: String,
    pub filename: String,
    pub size: u64,
    pub replication_factor: usize,
    pub chunks: Vec<ChunkUploadReport>,
}

impl UploadReport {
    /// Chunks stored on fewer nodes than requested.
    pub fn under_replicated(&self) -> impl Iterator<Item = &ChunkUploadReport> {
        self.chunks.iter().filter(|chunk| chunk.is_partial())
    }

    pub fn is_fully_replicated(&self) -> bool {
        self.under_replicated().next().is_none()
    }
}

#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub file_id: String,
    pub path: PathBuf,
    pub bytes: u64,
    pub total_chunks: u32,
}
