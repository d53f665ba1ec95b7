//! Error Taxonomy
//!
//! A single error type shared by the codec, the chunk store, the registry and the
//! client flows. Node-scoped failures (`Transport`) are absorbed by the callers that
//! fan out over nodes; everything else propagates to the top-level operation.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Chunk {index} of file {file_id} not found")]
    ChunkNotFound { file_id: String, index: u32 },

    /// A chunk id unknown to a node's local store.
    #[error("Chunk not found: {0}")]
    StoredChunkNotFound(String),

    #[error("Not enough healthy nodes. Need {required}, have {available}")]
    InsufficientHealthyNodes { required: usize, available: usize },

    #[error("Failed to upload chunk {index} to any node")]
    TotalUploadFailure { index: u32 },

    #[error("Chunk {index} of file {file_id} could not be retrieved from any healthy node")]
    ChunkUnavailable { file_id: String, index: u32 },

    #[error("Transport error talking to {node_id}: {message}")]
    Transport { node_id: String, message: String },

    /// Non-success answer from a remote service that has no local counterpart.
    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Duplicate chunk index {0}")]
    DuplicateChunkIndex(u32),

    #[error("Missing chunk index {0}")]
    MissingChunkIndex(u32),

    #[error("Chunk size must be positive")]
    InvalidChunkSize,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StorageError {
    pub fn transport(node_id: impl Into<String>, message: impl ToString) -> Self {
        StorageError::Transport {
            node_id: node_id.into(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::FileNotFound(_)
                | StorageError::ChunkNotFound { .. }
                | StorageError::StoredChunkNotFound(_)
        )
    }

    /// HTTP status used when this error crosses a service boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            StorageError::FileNotFound(_)
            | StorageError::ChunkNotFound { .. }
            | StorageError::StoredChunkNotFound(_) => StatusCode::NOT_FOUND,
            StorageError::InvalidDescriptor(_)
            | StorageError::MissingField(_)
            | StorageError::DuplicateChunkIndex(_)
            | StorageError::MissingChunkIndex(_)
            | StorageError::InvalidChunkSize => StatusCode::BAD_REQUEST,
            StorageError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            StorageError::InsufficientHealthyNodes { .. }
            | StorageError::ChunkUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            StorageError::Transport { .. } => StatusCode::BAD_GATEWAY,
            StorageError::Remote { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            StorageError::TotalUploadFailure { .. }
            | StorageError::Io(_)
            | StorageError::Serialization(_)
            | StorageError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Bodies the `Json` extractor refuses still answer with an `ErrorResponse`.
impl From<JsonRejection> for StorageError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            StorageError::PayloadTooLarge(rejection.body_text())
        } else {
            StorageError::InvalidDescriptor(rejection.body_text())
        }
    }
}

/// Error payload returned by every service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
