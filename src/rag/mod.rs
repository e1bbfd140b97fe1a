//! Vector storage and retrieval.

mod sqlite;
mod store;
mod vector_store;

pub use sqlite::SqliteRagStore;
pub use store::{ChunkSearchResult, RagStore, StoreStats, StoredChunk};
pub use vector_store::VectorStore;
