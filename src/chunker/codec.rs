use super::types::*;
use crate::error::{Result, StorageError};

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Splits byte streams into chunks of a fixed size.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Chunker {
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(StorageError::InvalidChunkSize);
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Splits the file at `path` under a freshly generated file id.
    pub fn split_file(&self, path: &Path) -> Result<SplitFile> {
        let file = File::open(path)?;
        self.split(file)
    }

    /// Splits `reader` under a freshly generated file id.
    pub fn split<R: Read>(&self, reader: R) -> Result<SplitFile> {
        let file_id = Uuid::new_v4().to_string();
        self.split_with_id(&file_id, reader)
    }

    /// Splits `reader` under a caller-supplied file id.
    pub fn split_with_id<R: Read>(&self, file_id: &str, mut reader: R) -> Result<SplitFile> {
        let mut chunks = Vec::new();
        let mut size = 0u64;

        loop {
            let mut data = Vec::with_capacity(self.chunk_size);
            reader
                .by_ref()
                .take(self.chunk_size as u64)
                .read_to_end(&mut data)?;

            // An empty read after the first chunk means the previous chunk ended exactly
            // on the boundary; an empty first read is the zero-byte file.
            if data.is_empty() && !chunks.is_empty() {
                break;
            }

            let index = chunks.len() as u32;
            let is_last = data.len() < self.chunk_size;
            size += data.len() as u64;

            chunks.push(Chunk {
                chunk_id: chunk_id(file_id, index, &data),
                index,
                size: data.len(),
                data,
            });

            if is_last {
                break;
            }
        }

        tracing::debug!(
            "Split file {} into {} chunk(s) ({} bytes, chunk size {})",
            file_id,
            chunks.len(),
            size,
            self.chunk_size
        );

        Ok(SplitFile {
            file_id: file_id.to_string(),
            total_chunks: chunks.len() as u32,
            size,
            chunks,
        })
    }
}

/// Content-addressed chunk identifier: `{file_id}_{index}_{md5(data)}`.
pub fn chunk_id(file_id: &str, index: u32, data: &[u8]) -> String {
    format!("{}_{}_{:x}", file_id, index, md5::compute(data))
}

/// Writes the chunks to `destination` in index order and returns the number of bytes
/// written.
///
/// The supplied chunks must cover `0..=max(index)` exactly once. The output is staged in
/// a temporary file beside `destination` and only renamed into place once complete.
pub fn reassemble<I>(chunks: I, destination: &Path) -> Result<u64>
where
    I: IntoIterator<Item = ChunkData>,
{
    let mut chunks: Vec<ChunkData> = chunks.into_iter().collect();
    if chunks.is_empty() {
        return Err(StorageError::MissingChunkIndex(0));
    }

    chunks.sort_by_key(|chunk| chunk.index);
    for (expected, chunk) in chunks.iter().enumerate() {
        let expected = expected as u32;
        if chunk.index < expected {
            return Err(StorageError::DuplicateChunkIndex(chunk.index));
        }
        if chunk.index > expected {
            return Err(StorageError::MissingChunkIndex(expected));
        }
    }

    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    let mut written = 0u64;
    for chunk in &chunks {
        tmp.write_all(&chunk.data)?;
        written += chunk.data.len() as u64;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(destination)
        .map_err(|e| StorageError::Io(e.error))?;

    tracing::debug!(
        "Reassembled {} chunk(s) into {:?} ({} bytes)",
        chunks.len(),
        destination,
        written
    );

    Ok(written)
}
