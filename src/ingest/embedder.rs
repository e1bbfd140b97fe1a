//! Chunking + embedding front end for the vector store.

use std::sync::Arc;

use serde_json::Value;

use super::chunker::TextSplitter;
use super::{Chunk, Document};
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn LlmProvider>,
    model: String,
    splitter: TextSplitter,
}

impl Embedder {
    pub fn new(provider: Arc<dyn LlmProvider>, model: String, splitter: TextSplitter) -> Self {
        Self {
            provider,
            model,
            splitter,
        }
    }

    /// Split documents into chunks ready for indexing. The only metadata
    /// normalization performed here is guaranteeing a `source` key.
    pub fn process_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = self.splitter.split_documents(documents);
        for chunk in &mut chunks {
            let has_source = chunk
                .metadata
                .get("source")
                .and_then(|v| v.as_str())
                .map(|s| !s.is_empty())
                .unwrap_or(false);
            if !has_source {
                chunk
                    .metadata
                    .insert("source".to_string(), Value::from("unknown"));
            }
        }
        chunks
    }

    /// Embedding failures propagate unchanged; retry policy belongs to the
    /// caller.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.provider.embed(texts, &self.model).await
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self.provider.embed(&[text.to_string()], &self.model).await?;
        vectors
            .pop()
            .ok_or_else(|| ApiError::Internal("embedding service returned no vector".to_string()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedProvider;

    #[test]
    fn process_documents_normalizes_missing_source() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let embedder = Embedder::new(provider, "embed".to_string(), TextSplitter::default());

        let chunks = embedder.process_documents(&[Document::new("no metadata at all")]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source(), "unknown");
    }

    #[tokio::test]
    async fn embed_one_returns_single_vector() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let embedder = Embedder::new(provider, "embed".to_string(), TextSplitter::default());

        let vector = embedder.embed_one("hello").await.unwrap();
        assert_eq!(vector, ScriptedProvider::embedding_of("hello"));
    }

    #[tokio::test]
    async fn embed_failure_propagates() {
        let provider = Arc::new(ScriptedProvider::failing());
        let embedder = Embedder::new(provider, "embed".to_string(), TextSplitter::default());

        assert!(embedder.embed_texts(&["x".to_string()]).await.is_err());
    }
}
