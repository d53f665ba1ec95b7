//! Chunk Codec Module
//!
//! Splits a byte stream into fixed-size, content-addressed chunks and puts them back
//! together in index order.
//!
//! ## Properties
//! - **Chunk count**: `ceil(size / chunk_size)`; an empty input still yields one empty chunk.
//! - **Identifiers**: `chunk_id` depends only on the file id, the index and the MD5 of the
//!   payload, so re-splitting identical content under the same file id is idempotent.
//! - **Reassembly**: input order is irrelevant; gaps and duplicate indices are rejected and
//!   the destination only appears once the whole file has been written.

pub mod codec;
pub mod types;

pub use codec::{Chunker, chunk_id, reassemble};
pub use types::{Chunk, ChunkData, DEFAULT_CHUNK_SIZE, SplitFile};

#[cfg(test)]
mod tests;
