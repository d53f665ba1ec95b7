use super::transport::{MetadataClient, NodeClient};
use super::types::*;
use crate::chunker::{Chunk, ChunkData, Chunker, chunk_id, reassemble};
use crate::error::{Result, StorageError};
use crate::health::{NodeId, NodeInfo, NodeStatus};
use crate::placement::{NodeOutcome, ReplicationDecision, decide};
use crate::registry::protocol::{ChunkLocationsResponse, DeleteFileResponse, FileInfoResponse};
use crate::registry::types::{ChunkRegistration, FileRegistration, FileSummary};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// The caller side of the system: splits, places, registers and reassembles files by
/// talking to the metadata server and the storage nodes.
pub struct StorageClient {
    metadata: MetadataClient,
    nodes: NodeClient,
    chunker: Chunker,
    replication_factor: usize,
    download_dir: PathBuf,
}

impl StorageClient {
    pub fn new(
        metadata_url: &str,
        chunker: Chunker,
        replication_factor: usize,
        request_timeout: Duration,
        transfer_timeout: Duration,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        let http = reqwest::Client::new();
        Self {
            metadata: MetadataClient::new(http.clone(), metadata_url, request_timeout),
            nodes: NodeClient::new(http, transfer_timeout),
            chunker,
            replication_factor,
            download_dir: download_dir.into(),
        }
    }

    pub fn metadata(&self) -> &MetadataClient {
        &self.metadata
    }

    pub async fn check_server(&self) -> bool {
        self.metadata.check_server().await
    }

    async fn require_server(&self) -> Result<()> {
        if self.metadata.check_server().await {
            return Ok(());
        }
        Err(StorageError::transport(
            self.metadata.base_url(),
            "metadata server is not available",
        ))
    }

    /// Splits `path`, registers it and pushes every chunk to `R` healthy nodes.
    ///
    /// A chunk that reaches at least one node is registered even if fewer than `R`
    /// accepted it; the report says which chunks are under-replicated. A chunk that no
    /// node accepts ends the upload with `TotalUploadFailure`.
    pub async fn upload_file(&self, path: &Path) -> Result<UploadReport> {
        self.require_server().await?;

        let split = self.chunker.split_file(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| split.file_id.clone());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        self.metadata
            .register_file(&FileRegistration {
                file_id: Some(split.file_id.clone()),
                filename: Some(filename.clone()),
                total_chunks: Some(split.total_chunks),
                size: Some(split.size),
                content_type: Some(content_type),
            })
            .await?;

        tracing::info!(
            "Uploading {} ({}) in {} chunk(s) with replication factor {}",
            filename,
            split.file_id,
            split.total_chunks,
            self.replication_factor
        );

        let mut chunks = Vec::with_capacity(split.chunks.len());
        for chunk in split.chunks {
            let report = self
                .upload_chunk(&split.file_id, split.total_chunks, chunk)
                .await?;
            chunks.push(report);
        }

        let report = UploadReport {
            file_id: split.file_id,
            filename,
            size: split.size,
            replication_factor: self.replication_factor,
            chunks,
        };

        let under_replicated = report.under_replicated().count();
        if under_replicated > 0 {
            tracing::warn!(
                "File {} uploaded with {} under-replicated chunk(s)",
                report.file_id,
                under_replicated
            );
        } else {
            tracing::info!("File {} uploaded", report.file_id);
        }
        Ok(report)
    }

    async fn upload_chunk(&self, file_id: &str, total_chunks: u32, chunk: Chunk) -> Result<ChunkUploadReport> {
        let targets = self
            .metadata
            .upload_locations(self.replication_factor)
            .await
            .inspect_err(|e| {
                tracing::error!("No upload locations for chunk {}: {}", chunk.index, e)
            })?;

        let outcomes = self.store_on_all(file_id, &chunk, &targets).await;
        let decision = decide(&outcomes, self.replication_factor);
        let failures: Vec<(NodeId, String)> = outcomes
            .into_iter()
            .filter_map(|outcome| outcome.result.err().map(|reason| (outcome.node_id, reason)))
            .collect();

        match &decision {
            ReplicationDecision::Failed { .. } => {
                tracing::error!(
                    "Chunk {}/{} was not accepted by any node",
                    chunk.index + 1,
                    total_chunks
                );
                return Err(StorageError::TotalUploadFailure { index: chunk.index });
            }
            ReplicationDecision::Partial { nodes, requested } => tracing::warn!(
                "Chunk {}/{} stored on {} of {} node(s)",
                chunk.index + 1,
                total_chunks,
                nodes.len(),
                requested
            ),
            ReplicationDecision::Complete { nodes } => tracing::debug!(
                "Chunk {}/{} stored on {:?}",
                chunk.index + 1,
                total_chunks,
                nodes
            ),
        }

        self.metadata
            .register_chunk(&ChunkRegistration {
                file_id: Some(file_id.to_string()),
                chunk_id: Some(chunk.chunk_id.clone()),
                index: Some(chunk.index),
                size: Some(chunk.size as u64),
                nodes: Some(decision.stored_on().to_vec()),
            })
            .await?;

        Ok(ChunkUploadReport {
            index: chunk.index,
            chunk_id: chunk.chunk_id,
            decision,
            failures,
        })
    }

    /// Stores `chunk` on every target concurrently. Outcomes are in target order; one
    /// node failing never stops the others.
    async fn store_on_all(&self, file_id: &str, chunk: &Chunk, targets: &[NodeInfo]) -> Vec<NodeOutcome> {
        let data: Arc<[u8]> = Arc::from(chunk.data.as_slice());

        let handles: Vec<_> = targets
            .iter()
            .map(|node| {
                let client = self.nodes.clone();
                let node = node.clone();
                let data = data.clone();
                let chunk_id = chunk.chunk_id.clone();
                let file_id = file_id.to_string();
                let index = chunk.index;
                let node_id = node.node_id.clone();
                let handle = tokio::spawn(async move {
                    client.store(&node, &chunk_id, &file_id, index, &data).await
                });
                (node_id, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (node_id, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(())) => NodeOutcome::success(node_id),
                Ok(Err(e)) => {
                    tracing::warn!("Failed to store chunk {} on {}: {}", chunk.index, node_id, e);
                    NodeOutcome::failure(node_id, e.to_string())
                }
                Err(e) => NodeOutcome::failure(node_id, e.to_string()),
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Fetches every chunk of `file_id` from a healthy replica and reassembles the file
    /// at `output` (default: the download directory plus the original filename).
    pub async fn download_file(&self, file_id: &str, output: Option<&Path>) -> Result<DownloadReport> {
        self.require_server().await?;

        let info = self.metadata.file_info(file_id).await?;
        let destination = match output {
            Some(path) => path.to_path_buf(),
            None => self.download_dir.join(local_name(&info.file.filename, file_id)),
        };

        tracing::info!(
            "Downloading {} ({}) with {} chunk(s)",
            info.file.filename,
            file_id,
            info.file.total_chunks
        );

        let mut chunks = Vec::with_capacity(info.file.total_chunks as usize);
        for index in 0..info.file.total_chunks {
            let locations = self.metadata.chunk_locations(file_id, index).await?;
            let data = self.fetch_chunk(file_id, index, &locations).await?;
            chunks.push(ChunkData { index, data });
        }

        let bytes = reassemble(chunks, &destination)?;
        tracing::info!("File {} downloaded to {:?}", file_id, destination);

        Ok(DownloadReport {
            file_id: file_id.to_string(),
            path: destination,
            bytes,
            total_chunks: info.file.total_chunks,
        })
    }

    /// Tries each candidate in order and returns the first payload whose content hash
    /// matches the registered chunk id.
    async fn fetch_chunk(&self, file_id: &str, index: u32, locations: &ChunkLocationsResponse) -> Result<Vec<u8>> {
        for node in &locations.nodes {
            match self.nodes.retrieve(node, &locations.chunk_id).await {
                Ok((data, _)) if chunk_id(file_id, index, &data) == locations.chunk_id => {
                    tracing::debug!("Retrieved chunk {} from {}", index, node.node_id);
                    return Ok(data);
                }
                Ok(_) => tracing::warn!(
                    "Chunk {} from {} does not match its content hash",
                    index,
                    node.node_id
                ),
                Err(e) => tracing::warn!(
                    "Failed to retrieve chunk {} from {}: {}",
                    index,
                    node.node_id,
                    e
                ),
            }
        }

        tracing::error!("Chunk {} of file {} is unavailable on every replica", index, file_id);
        Err(StorageError::ChunkUnavailable {
            file_id: file_id.to_string(),
            index,
        })
    }

    pub async fn list_files(&self) -> Result<Vec<FileSummary>> {
        self.require_server().await?;
        self.metadata.list_files().await
    }

    pub async fn file_info(&self, file_id: &str) -> Result<FileInfoResponse> {
        self.require_server().await?;
        self.metadata.file_info(file_id).await
    }

    pub async fn node_status(&self) -> Result<Vec<NodeStatus>> {
        self.require_server().await?;
        self.metadata.node_status().await
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<DeleteFileResponse> {
        self.require_server().await?;
        self.metadata.delete_file(file_id).await
    }
}

/// Last path component of a registered filename, so a download never escapes the
/// download directory.
fn local_name(filename: &str, fallback: &str) -> String {
    Path::new(filename)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .unwrap_or_else(|| fallback.to_string())
}
