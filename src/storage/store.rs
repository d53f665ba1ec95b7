use crate::error::{Result, StorageError};
use crate::persist::{safe_component, write_atomic};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const META_SUFFIX: &str = ".meta";

/// Descriptor stored next to every chunk payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub chunk_id: String,
    pub file_id: String,
    pub index: u32,
    pub size: u64,
}

pub struct ChunkStore {
    root: PathBuf,
    /// chunk_id -> owning file_id
    index: DashMap<String, String>,
}

impl ChunkStore {
    /// Opens (creating if needed) the store rooted at `root` and indexes what is on disk.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        let store = Self {
            root,
            index: DashMap::new(),
        };
        store.rebuild_index()?;

        tracing::info!(
            "Opened chunk store at {:?} with {} chunk(s)",
            store.root,
            store.index.len()
        );
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, chunk_id: &str) -> bool {
        self.index.contains_key(chunk_id)
    }

    fn rebuild_index(&self) -> Result<()> {
        for dir in std::fs::read_dir(&self.root)? {
            let dir = dir?;
            if !dir.file_type()?.is_dir() {
                continue;
            }

            for entry in std::fs::read_dir(dir.path())? {
                let path = entry?.path();
                let is_meta = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(META_SUFFIX) && !name.starts_with('.'));
                if !is_meta {
                    continue;
                }

                match read_metadata(&path) {
                    Ok(meta) if self.payload_path(&meta.file_id, &meta.chunk_id).exists() => {
                        self.index.insert(meta.chunk_id, meta.file_id);
                    }
                    Ok(meta) => {
                        tracing::warn!("Skipping chunk {} without payload", meta.chunk_id);
                    }
                    Err(e) => {
                        tracing::warn!("Skipping unreadable descriptor {:?}: {}", path, e);
                    }
                }
            }
        }

        Ok(())
    }

    fn payload_path(&self, file_id: &str, chunk_id: &str) -> PathBuf {
        self.root.join(file_id).join(chunk_id)
    }

    fn meta_path(&self, file_id: &str, chunk_id: &str) -> PathBuf {
        self.root
            .join(file_id)
            .join(format!("{}{}", chunk_id, META_SUFFIX))
    }

    /// Stores a chunk payload and its descriptor. Storing the same chunk id again
    /// overwrites it.
    pub fn put(&self, chunk_id: &str, file_id: &str, index: u32, data: &[u8]) -> Result<ChunkMetadata> {
        safe_component(chunk_id, "chunk_id")?;
        safe_component(file_id, "file_id")?;
        if chunk_id.ends_with(META_SUFFIX) {
            return Err(StorageError::InvalidDescriptor(format!(
                "chunk_id may not end with {}",
                META_SUFFIX
            )));
        }

        let meta = ChunkMetadata {
            chunk_id: chunk_id.to_string(),
            file_id: file_id.to_string(),
            index,
            size: data.len() as u64,
        };

        write_atomic(&self.payload_path(file_id, chunk_id), data)?;
        write_atomic(
            &self.meta_path(file_id, chunk_id),
            &serde_json::to_vec(&meta)?,
        )?;
        self.index.insert(chunk_id.to_string(), file_id.to_string());

        tracing::debug!(
            "Stored chunk {} (file {}, index {}, {} bytes)",
            chunk_id,
            file_id,
            index,
            data.len()
        );
        Ok(meta)
    }

    /// Payload and descriptor for `chunk_id`.
    pub fn get(&self, chunk_id: &str) -> Result<(Vec<u8>, ChunkMetadata)> {
        let file_id = self.owner(chunk_id)?;

        let data = match std::fs::read(self.payload_path(&file_id, chunk_id)) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Chunk {} indexed but missing on disk", chunk_id);
                self.index.remove(chunk_id);
                return Err(StorageError::StoredChunkNotFound(chunk_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let meta = read_metadata(&self.meta_path(&file_id, chunk_id))?;

        Ok((data, meta))
    }

    /// Removes payload and descriptor.
    pub fn delete(&self, chunk_id: &str) -> Result<()> {
        let (_, file_id) = self
            .index
            .remove(chunk_id)
            .ok_or_else(|| StorageError::StoredChunkNotFound(chunk_id.to_string()))?;

        remove_if_present(&self.payload_path(&file_id, chunk_id))?;
        remove_if_present(&self.meta_path(&file_id, chunk_id))?;

        // Only succeeds once the file's last chunk is gone.
        let _ = std::fs::remove_dir(self.root.join(&file_id));

        tracing::debug!("Deleted chunk {} (file {})", chunk_id, file_id);
        Ok(())
    }

    /// Lazily reads the descriptor of every stored chunk. Chunks removed while iterating
    /// are skipped.
    pub fn list(&self) -> impl Iterator<Item = ChunkMetadata> + '_ {
        let entries: Vec<(String, String)> = self
            .index
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        entries
            .into_iter()
            .filter_map(move |(chunk_id, file_id)| {
                read_metadata(&self.meta_path(&file_id, &chunk_id)).ok()
            })
    }

    fn owner(&self, chunk_id: &str) -> Result<String> {
        self.index
            .get(chunk_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::StoredChunkNotFound(chunk_id.to_string()))
    }
}

fn read_metadata(path: &Path) -> Result<ChunkMetadata> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
