use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    routing::{delete, get, post},
};
use std::sync::Arc;

use super::protocol::*;
use super::store::ChunkStore;
use crate::error::Result;
use crate::health::NodeId;
use crate::health::monitor::ENDPOINT_HEALTHCHECK;
use crate::persist::blocking;

/// Request bodies carry base64 payloads, roughly 4/3 of the chunk size.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Largest chunk whose store request fits in `MAX_BODY_BYTES`, leaving 1 MiB for the
/// JSON envelope.
pub const MAX_CHUNK_SIZE: usize = (MAX_BODY_BYTES / 4) * 3 - 1024 * 1024;

/// A storage node: its identity plus its local chunk store.
pub struct StorageNode {
    pub node_id: NodeId,
    pub store: ChunkStore,
}

impl StorageNode {
    pub fn new(node_id: NodeId, store: ChunkStore) -> Arc<Self> {
        Arc::new(Self { node_id, store })
    }
}

/// HTTP routes served by a storage node.
pub fn router(node: Arc<StorageNode>) -> Router {
    Router::new()
        .route(ENDPOINT_HEALTHCHECK, get(handle_healthcheck))
        .route(ENDPOINT_STORE, post(handle_store))
        .route(&format!("{}/:chunk_id", ENDPOINT_RETRIEVE), get(handle_retrieve))
        .route(ENDPOINT_LIST, get(handle_list))
        .route(&format!("{}/:chunk_id", ENDPOINT_DELETE), delete(handle_delete))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(Extension(node))
}

pub async fn handle_healthcheck(
    Extension(node): Extension<Arc<StorageNode>>,
) -> (StatusCode, Json<NodeHealthResponse>) {
    (
        StatusCode::OK,
        Json(NodeHealthResponse {
            status: "healthy".to_string(),
            node_id: node.node_id.clone(),
        }),
    )
}

pub async fn handle_store(
    Extension(node): Extension<Arc<StorageNode>>,
    payload: std::result::Result<Json<StoreChunkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StoreChunkResponse>)> {
    let Json(req) = payload?;
    let chunk = req.validate()?;

    let worker = node.clone();
    let chunk = blocking(move || {
        worker
            .store
            .put(&chunk.chunk_id, &chunk.file_id, chunk.index, &chunk.data)?;
        Ok(chunk)
    })
    .await?;

    tracing::info!(
        "Node {} stored chunk {} ({} bytes)",
        node.node_id,
        chunk.chunk_id,
        chunk.data.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(StoreChunkResponse {
            status: "success".to_string(),
            message: "Chunk stored successfully".to_string(),
            node_id: node.node_id.clone(),
            chunk_id: chunk.chunk_id,
        }),
    ))
}

pub async fn handle_retrieve(
    Extension(node): Extension<Arc<StorageNode>>,
    Path(chunk_id): Path<String>,
) -> Result<(StatusCode, Json<RetrieveChunkResponse>)> {
    let worker = node.clone();
    let id = chunk_id.clone();
    let (data, metadata) = blocking(move || worker.store.get(&id)).await?;

    tracing::debug!("Node {} serving chunk {}", node.node_id, chunk_id);

    Ok((
        StatusCode::OK,
        Json(RetrieveChunkResponse {
            status: "success".to_string(),
            data: encode_payload(&data),
            metadata,
            node_id: node.node_id.clone(),
        }),
    ))
}

pub async fn handle_list(
    Extension(node): Extension<Arc<StorageNode>>,
) -> Result<(StatusCode, Json<ListChunksResponse>)> {
    let worker = node.clone();
    let mut chunks = blocking(move || Ok(worker.store.list().collect::<Vec<_>>())).await?;
    chunks.sort_by(|a, b| (&a.file_id, a.index).cmp(&(&b.file_id, b.index)));

    Ok((
        StatusCode::OK,
        Json(ListChunksResponse {
            status: "success".to_string(),
            node_id: node.node_id.clone(),
            chunks,
        }),
    ))
}

pub async fn handle_delete(
    Extension(node): Extension<Arc<StorageNode>>,
    Path(chunk_id): Path<String>,
) -> Result<(StatusCode, Json<DeleteChunkResponse>)> {
    let worker = node.clone();
    let id = chunk_id.clone();
    blocking(move || worker.store.delete(&id)).await?;

    tracing::info!("Node {} deleted chunk {}", node.node_id, chunk_id);

    Ok((
        StatusCode::OK,
        Json(DeleteChunkResponse {
            status: "success".to_string(),
            message: "Chunk deleted successfully".to_string(),
            node_id: node.node_id.clone(),
        }),
    ))
}
