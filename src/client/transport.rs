use crate::error::{ErrorResponse, Result, StorageError};
use crate::health::monitor::ENDPOINT_HEALTHCHECK;
use crate::health::{NodeInfo, NodeStatus};
use crate::registry::protocol::*;
use crate::registry::types::{
    ChunkDescriptor, ChunkRegistration, FileDescriptor, FileRegistration, FileSummary,
};
use crate::storage::ChunkMetadata;
use crate::storage::protocol::*;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

const METADATA_TARGET: &str = "metadata";

/// Decodes a success body, or turns an error answer into `StorageError::Remote`.
async fn decode<T: DeserializeOwned>(target: &str, resp: reqwest::Response) -> Result<T> {
    if !resp.status().is_success() {
        return Err(remote_error(resp).await);
    }
    resp.json::<T>()
        .await
        .map_err(|e| StorageError::transport(target, e))
}

async fn remote_error(resp: reqwest::Response) -> StorageError {
    let status = resp.status();
    let message = match resp.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    StorageError::Remote {
        status: status.as_u16(),
        message,
    }
}

/// Talks to storage nodes.
#[derive(Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    transfer_timeout: Duration,
}

impl NodeClient {
    pub fn new(http: reqwest::Client, transfer_timeout: Duration) -> Self {
        Self {
            http,
            transfer_timeout,
        }
    }

    /// Pushes one chunk to `node`. Only a `201` counts as stored.
    pub async fn store(
        &self,
        node: &NodeInfo,
        chunk_id: &str,
        file_id: &str,
        index: u32,
        data: &[u8],
    ) -> Result<()> {
        let resp = self
            .http
            .post(node.endpoint(ENDPOINT_STORE))
            .json(&StoreChunkRequest::new(chunk_id, file_id, index, data))
            .timeout(self.transfer_timeout)
            .send()
            .await
            .map_err(|e| StorageError::transport(node.node_id.as_str(), e))?;

        if resp.status() != StatusCode::CREATED {
            return Err(remote_error(resp).await);
        }

        Ok(())
    }

    pub async fn retrieve(&self, node: &NodeInfo, chunk_id: &str) -> Result<(Vec<u8>, ChunkMetadata)> {
        let resp = self
            .http
            .get(node.endpoint(&format!("{}/{}", ENDPOINT_RETRIEVE, chunk_id)))
            .timeout(self.transfer_timeout)
            .send()
            .await
            .map_err(|e| StorageError::transport(node.node_id.as_str(), e))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::StoredChunkNotFound(chunk_id.to_string()));
        }

        let body: RetrieveChunkResponse = decode(node.node_id.as_str(), resp).await?;
        Ok((decode_payload(&body.data)?, body.metadata))
    }
}

/// Talks to the metadata server.
#[derive(Clone)]
pub struct MetadataClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl MetadataClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .http
            .get(self.url(path))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| StorageError::transport(METADATA_TARGET, e))?;
        decode(METADATA_TARGET, resp).await
    }

    /// `true` if the metadata server answers its health check.
    pub async fn check_server(&self) -> bool {
        let resp = self
            .http
            .get(self.url(ENDPOINT_HEALTHCHECK))
            .timeout(self.request_timeout)
            .send()
            .await;
        matches!(resp, Ok(resp) if resp.status() == StatusCode::OK)
    }

    pub async fn register_file(&self, registration: &FileRegistration) -> Result<FileDescriptor> {
        let resp = self
            .http
            .post(self.url(ENDPOINT_REGISTER_FILE))
            .json(registration)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| StorageError::transport(METADATA_TARGET, e))?;
        let body: RegisterFileResponse = decode(METADATA_TARGET, resp).await?;
        Ok(body.file)
    }

    pub async fn register_chunk(&self, registration: &ChunkRegistration) -> Result<ChunkDescriptor> {
        let resp = self
            .http
            .post(self.url(ENDPOINT_REGISTER_CHUNK))
            .json(registration)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| StorageError::transport(METADATA_TARGET, e))?;

        match decode::<RegisterChunkResponse>(METADATA_TARGET, resp).await {
            Ok(body) => Ok(body.chunk),
            Err(StorageError::Remote { status: 404, .. }) => Err(StorageError::FileNotFound(
                registration.file_id.clone().unwrap_or_default(),
            )),
            Err(e) => Err(e),
        }
    }

    pub async fn upload_locations(&self, replicas: usize) -> Result<Vec<NodeInfo>> {
        let path = format!("{}?replicas={}", ENDPOINT_UPLOAD_LOCATIONS, replicas);
        let body: UploadLocationsResponse = self.get(&path).await?;
        Ok(body.nodes)
    }

    pub async fn file_info(&self, file_id: &str) -> Result<FileInfoResponse> {
        match self.get(&format!("{}/{}", ENDPOINT_FILE_INFO, file_id)).await {
            Err(StorageError::Remote { status: 404, .. }) => {
                Err(StorageError::FileNotFound(file_id.to_string()))
            }
            other => other,
        }
    }

    pub async fn list_files(&self) -> Result<Vec<FileSummary>> {
        let body: ListFilesResponse = self.get(ENDPOINT_LIST_FILES).await?;
        Ok(body.files)
    }

    pub async fn chunk_locations(&self, file_id: &str, index: u32) -> Result<ChunkLocationsResponse> {
        let path = format!("{}/{}/{}", ENDPOINT_CHUNK_LOCATIONS, file_id, index);
        match self.get(&path).await {
            Err(StorageError::Remote { status: 404, .. }) => Err(StorageError::ChunkNotFound {
                file_id: file_id.to_string(),
                index,
            }),
            Err(StorageError::Remote { status: 503, .. }) => Err(StorageError::ChunkUnavailable {
                file_id: file_id.to_string(),
                index,
            }),
            other => other,
        }
    }

    pub async fn node_status(&self) -> Result<Vec<NodeStatus>> {
        let body: NodeStatusResponse = self.get(ENDPOINT_NODE_STATUS).await?;
        Ok(body.nodes)
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<DeleteFileResponse> {
        let resp = self
            .http
            .delete(self.url(&format!("{}/{}", ENDPOINT_DELETE_FILE, file_id)))
            // The server fans out to nodes under the same timeout before answering.
            .timeout(self.request_timeout * 2)
            .send()
            .await
            .map_err(|e| StorageError::transport(METADATA_TARGET, e))?;

        match decode(METADATA_TARGET, resp).await {
            Err(StorageError::Remote { status: 404, .. }) => {
                Err(StorageError::FileNotFound(file_id.to_string()))
            }
            other => other,
        }
    }
}
