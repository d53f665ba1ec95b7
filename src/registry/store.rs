use super::types::*;
use crate::error::{Result, StorageError};
use crate::persist::{safe_component, write_atomic};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const RECORD_EXTENSION: &str = "json";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Authoritative file -> chunk placement mapping, backed by one JSON record per file.
///
/// Mutations of a file's record happen under that record's map guard, so concurrent
/// chunk registrations for the same file are applied one at a time and none is lost.
pub struct Registry {
    dir: PathBuf,
    files: DashMap<String, FileRecord>,
}

impl Registry {
    /// Opens (creating if needed) the registry stored in `dir` and loads every record.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let files = DashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }

            match read_record(&path) {
                Ok(record) => {
                    files.insert(record.file.file_id.clone(), record);
                }
                Err(e) => tracing::warn!("Skipping unreadable file record {:?}: {}", path, e),
            }
        }

        tracing::info!("Loaded {} file record(s) from {:?}", files.len(), dir);
        Ok(Self { dir, files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn record_path(&self, file_id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", file_id, RECORD_EXTENSION))
    }

    fn persist(&self, record: &FileRecord) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.record_path(&record.file.file_id), &bytes)
    }

    /// Creates a file with an empty chunk map. Registering an existing `file_id` again
    /// replaces its record, chunk map included.
    pub fn register_file(&self, registration: FileRegistration) -> Result<FileDescriptor> {
        let file_id = registration
            .file_id
            .ok_or(StorageError::MissingField("file_id"))?;
        let filename = registration
            .filename
            .ok_or(StorageError::MissingField("filename"))?;
        let total_chunks = registration
            .total_chunks
            .ok_or(StorageError::MissingField("total_chunks"))?;

        safe_component(&file_id, "file_id")?;
        if total_chunks == 0 {
            return Err(StorageError::InvalidDescriptor(
                "total_chunks must be positive".to_string(),
            ));
        }

        let now = now_ms();
        let file = FileDescriptor {
            file_id: file_id.clone(),
            filename,
            size: registration.size.unwrap_or(0),
            content_type: registration
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            total_chunks,
            created_at: now,
            updated_at: now,
        };

        let record = FileRecord::new(file.clone());
        match self.files.entry(file_id.clone()) {
            Entry::Occupied(mut existing) => {
                self.persist(&record)?;
                existing.insert(record);
                tracing::warn!("File {} re-registered, previous chunk map discarded", file_id);
            }
            Entry::Vacant(slot) => {
                self.persist(&record)?;
                slot.insert(record);
            }
        }

        tracing::info!(
            "Registered file {} ({}, {} chunk(s))",
            file_id,
            file.filename,
            file.total_chunks
        );
        Ok(file)
    }

    /// Records where chunk `index` of a file lives, replacing any previous location.
    pub fn register_chunk(&self, registration: ChunkRegistration) -> Result<ChunkDescriptor> {
        let file_id = registration
            .file_id
            .ok_or(StorageError::MissingField("file_id"))?;
        let chunk_id = registration
            .chunk_id
            .ok_or(StorageError::MissingField("chunk_id"))?;
        let index = registration
            .index
            .ok_or(StorageError::MissingField("index"))?;
        let mut nodes = registration
            .nodes
            .ok_or(StorageError::MissingField("nodes"))?;

        if nodes.is_empty() {
            return Err(StorageError::InvalidDescriptor(format!(
                "chunk {} of file {} has no nodes",
                index, file_id
            )));
        }
        let mut seen = HashSet::new();
        nodes.retain(|node| seen.insert(node.clone()));

        let mut entry = self
            .files
            .get_mut(&file_id)
            .ok_or_else(|| StorageError::FileNotFound(file_id.clone()))?;

        if index >= entry.file.total_chunks {
            return Err(StorageError::InvalidDescriptor(format!(
                "chunk index {} out of range for file {} with {} chunk(s)",
                index, file_id, entry.file.total_chunks
            )));
        }

        let chunk = ChunkDescriptor {
            chunk_id,
            file_id: file_id.clone(),
            index,
            size: registration.size.unwrap_or(0),
            nodes,
        };

        // Persist first; the in-memory record only changes once the disk has it.
        let mut updated = entry.value().clone();
        updated.chunks.insert(index, chunk.clone());
        updated.file.updated_at = now_ms().max(updated.file.updated_at);
        self.persist(&updated)?;
        *entry = updated;

        tracing::debug!(
            "Registered chunk {} of file {} on {:?}",
            index,
            file_id,
            chunk.nodes
        );
        Ok(chunk)
    }

    pub fn get_file(&self, file_id: &str) -> Result<FileRecord> {
        self.files
            .get(file_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::FileNotFound(file_id.to_string()))
    }

    /// Every file, oldest first.
    pub fn list_files(&self) -> Vec<FileSummary> {
        let mut summaries: Vec<FileSummary> = self
            .files
            .iter()
            .map(|entry| entry.value().summary())
            .collect();
        summaries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.file_id.cmp(&b.file_id))
        });
        summaries
    }

    pub fn resolve_chunk(&self, file_id: &str, index: u32) -> Result<ChunkDescriptor> {
        let entry = self
            .files
            .get(file_id)
            .ok_or_else(|| StorageError::FileNotFound(file_id.to_string()))?;

        entry
            .chunks
            .get(&index)
            .cloned()
            .ok_or_else(|| StorageError::ChunkNotFound {
                file_id: file_id.to_string(),
                index,
            })
    }

    /// Removes the file and all its chunk records, returning what was removed. The
    /// record stays registered if its file cannot be removed from disk.
    pub fn delete_file(&self, file_id: &str) -> Result<FileRecord> {
        let Entry::Occupied(entry) = self.files.entry(file_id.to_string()) else {
            return Err(StorageError::FileNotFound(file_id.to_string()));
        };

        match std::fs::remove_file(self.record_path(file_id)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let (_, record) = entry.remove_entry();

        tracing::info!(
            "Deleted file {} ({} chunk record(s))",
            file_id,
            record.chunks.len()
        );
        Ok(record)
    }
}

fn read_record(path: &Path) -> Result<FileRecord> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
