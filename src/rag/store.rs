//! RagStore trait — abstract interface for vector storage backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A persisted chunk with metadata; the unit of persistence and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique record identifier.
    pub chunk_id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Source identifier (file name, URL, etc.).
    pub source: String,
    /// Optional metadata (JSON).
    pub metadata: Option<serde_json::Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Cosine similarity (higher = closer).
    pub score: f32,
}

/// Cardinality and health snapshot. `status` degrades to an error string
/// instead of the producing call failing.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub count: usize,
    pub status: String,
}

/// Abstract trait for vector storage backends.
///
/// Implementations own two invariants: every stored vector has the
/// store-wide dimension, and a batch insert is atomic — readers never see
/// part of a batch.
#[async_trait]
pub trait RagStore: Send + Sync {
    /// Insert chunks with their embedding vectors in one atomic batch.
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), ApiError>;

    /// Return up to `limit` chunks nearest to the query embedding, best
    /// first. An empty store yields an empty result.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    /// Irreversibly drop all records, returning how many were removed.
    async fn clear_all(&self) -> Result<usize, ApiError>;

    /// Total record count.
    async fn count(&self) -> Result<usize, ApiError>;

    /// The pinned embedding dimension, if any vector has been stored.
    async fn dimension(&self) -> Result<Option<usize>, ApiError>;
}
