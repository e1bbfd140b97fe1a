//! Document ingestion: loading, chunking, embedding.

pub mod chunker;
pub mod embedder;
pub mod loader;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A loaded source document. Immutable once produced by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(content: impl Into<String>, metadata: Map<String, Value>) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
    }
}

/// A bounded text span cut from a Document, the unit of embedding and
/// retrieval. Carries the parent document's metadata plus its own offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: Map<String, Value>,
}

impl Chunk {
    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
    }
}
