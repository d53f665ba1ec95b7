use super::protocol::*;
use super::service::MetadataService;
use super::types::*;
use crate::error::Result;
use crate::health::monitor::ENDPOINT_HEALTHCHECK;
use crate::persist::blocking;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    routing::{delete, get, post},
};
use std::sync::Arc;

/// HTTP routes served by the metadata server.
pub fn router(service: Arc<MetadataService>) -> Router {
    Router::new()
        .route(ENDPOINT_HEALTHCHECK, get(handle_healthcheck))
        .route(ENDPOINT_REGISTER_FILE, post(handle_register_file))
        .route(ENDPOINT_REGISTER_CHUNK, post(handle_register_chunk))
        .route(ENDPOINT_UPLOAD_LOCATIONS, get(handle_upload_locations))
        .route(&format!("{}/:file_id", ENDPOINT_FILE_INFO), get(handle_file_info))
        .route(ENDPOINT_LIST_FILES, get(handle_list_files))
        .route(
            &format!("{}/:file_id/:index", ENDPOINT_CHUNK_LOCATIONS),
            get(handle_chunk_locations),
        )
        .route(ENDPOINT_NODE_STATUS, get(handle_node_status))
        .route(&format!("{}/:file_id", ENDPOINT_DELETE_FILE), delete(handle_delete_file))
        .layer(Extension(service))
}

pub async fn handle_healthcheck(
    Extension(service): Extension<Arc<MetadataService>>,
) -> (StatusCode, Json<ServerHealthResponse>) {
    let snapshot = service.health().snapshot();
    (
        StatusCode::OK,
        Json(ServerHealthResponse {
            status: "healthy".to_string(),
            healthy_nodes: snapshot.healthy_count(),
            total_nodes: snapshot.len(),
        }),
    )
}

pub async fn handle_register_file(
    Extension(service): Extension<Arc<MetadataService>>,
    payload: std::result::Result<Json<FileRegistration>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterFileResponse>)> {
    let Json(req) = payload?;
    let file = blocking(move || service.registry.register_file(req)).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterFileResponse {
            status: "success".to_string(),
            file,
        }),
    ))
}

pub async fn handle_register_chunk(
    Extension(service): Extension<Arc<MetadataService>>,
    payload: std::result::Result<Json<ChunkRegistration>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterChunkResponse>)> {
    let Json(req) = payload?;
    let chunk = blocking(move || service.registry.register_chunk(req)).await?;
    Ok((
        StatusCode::OK,
        Json(RegisterChunkResponse {
            status: "success".to_string(),
            chunk,
        }),
    ))
}

pub async fn handle_upload_locations(
    Extension(service): Extension<Arc<MetadataService>>,
    Query(query): Query<UploadLocationsQuery>,
) -> Result<(StatusCode, Json<UploadLocationsResponse>)> {
    let nodes = service.upload_locations(query.replicas)?;
    Ok((
        StatusCode::OK,
        Json(UploadLocationsResponse {
            status: "success".to_string(),
            nodes,
        }),
    ))
}

pub async fn handle_file_info(
    Extension(service): Extension<Arc<MetadataService>>,
    Path(file_id): Path<String>,
) -> Result<(StatusCode, Json<FileInfoResponse>)> {
    let record = blocking(move || service.registry.get_file(&file_id)).await?;
    Ok((StatusCode::OK, Json(record.into())))
}

pub async fn handle_list_files(
    Extension(service): Extension<Arc<MetadataService>>,
) -> Result<(StatusCode, Json<ListFilesResponse>)> {
    let files = blocking(move || Ok(service.registry.list_files())).await?;
    Ok((
        StatusCode::OK,
        Json(ListFilesResponse {
            status: "success".to_string(),
            files,
        }),
    ))
}

pub async fn handle_chunk_locations(
    Extension(service): Extension<Arc<MetadataService>>,
    Path((file_id, index)): Path<(String, u32)>,
) -> Result<(StatusCode, Json<ChunkLocationsResponse>)> {
    let locations = blocking(move || service.chunk_locations(&file_id, index)).await?;
    Ok((StatusCode::OK, Json(locations)))
}

pub async fn handle_node_status(
    Extension(service): Extension<Arc<MetadataService>>,
) -> (StatusCode, Json<NodeStatusResponse>) {
    (
        StatusCode::OK,
        Json(NodeStatusResponse {
            status: "success".to_string(),
            nodes: service.node_status(),
        }),
    )
}

pub async fn handle_delete_file(
    Extension(service): Extension<Arc<MetadataService>>,
    Path(file_id): Path<String>,
) -> Result<(StatusCode, Json<DeleteFileResponse>)> {
    let response = service.delete_file(&file_id).await?;
    Ok((StatusCode::OK, Json(response)))
}
