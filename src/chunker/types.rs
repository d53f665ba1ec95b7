/// Default chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// One contiguous piece of a split file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_id: String,
    /// 0-based position in the file.
    pub index: u32,
    pub size: usize,
    pub data: Vec<u8>,
}

/// Result of splitting a file.
#[derive(Debug, Clone)]
pub struct SplitFile {
    pub file_id: String,
    pub total_chunks: u32,
    /// Total number of bytes read.
    pub size: u64,
    pub chunks: Vec<Chunk>,
}

/// A chunk payload handed back for reassembly, possibly fetched from any node
/// and arriving in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkData {
    pub index: u32,
    pub data: Vec<u8>,
}

impl From<Chunk> for ChunkData {
    fn from(chunk: Chunk) -> Self {
        Self {
            index: chunk.index,
            data: chunk.data,
        }
    }
}
