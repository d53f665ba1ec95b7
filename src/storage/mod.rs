//! Chunk Storage Module
//!
//! Node-local, content-addressed persistence of chunk payloads, plus the HTTP surface a
//! storage node exposes to the rest of the cluster.
//!
//! ## Layout
//! - One directory per owning file id, holding `<chunk_id>` (payload) and
//!   `<chunk_id>.meta` (JSON descriptor) side by side.
//! - An in-memory `chunk_id -> file_id` index, rebuilt on open, so lookups need the
//!   chunk id alone.
//! - Every write goes through a temporary file and a rename.

pub mod handlers;
pub mod protocol;
pub mod store;

pub use store::{ChunkMetadata, ChunkStore};
