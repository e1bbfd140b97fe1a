//! High-level vector store facade: chunk + embed + persist on the write
//! path, embed + nearest-neighbor on the read path.

use std::sync::Arc;

use uuid::Uuid;

use super::store::{ChunkSearchResult, RagStore, StoreStats, StoredChunk};
use crate::core::errors::ApiError;
use crate::ingest::embedder::Embedder;
use crate::ingest::Document;

#[derive(Clone)]
pub struct VectorStore {
    store: Arc<dyn RagStore>,
    embedder: Embedder,
}

impl VectorStore {
    pub fn new(store: Arc<dyn RagStore>, embedder: Embedder) -> Self {
        Self { store, embedder }
    }

    /// Chunk, embed and persist documents. No-op on empty input. The whole
    /// batch lands in one store transaction, so a failed call leaves no
    /// partial batch behind.
    pub async fn add_documents(&self, documents: &[Document]) -> Result<usize, ApiError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let chunks = self.embedder.process_documents(documents);
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_texts(&texts).await?;

        let items: Vec<(StoredChunk, Vec<f32>)> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let stored = StoredChunk {
                    chunk_id: Uuid::new_v4().to_string(),
                    content: chunk.content,
                    source: chunk
                        .metadata
                        .get("source")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown")
                        .to_string(),
                    metadata: Some(serde_json::Value::Object(chunk.metadata)),
                };
                (stored, vector)
            })
            .collect();

        let inserted = items.len();
        self.store.insert_batch(items).await?;
        Ok(inserted)
    }

    /// Top-k nearest chunks for a query, best first. An empty store is a
    /// valid state and yields an empty result without touching the
    /// embedding service.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<StoredChunk>, ApiError> {
        let results = self.similarity_search_with_score(query, k).await?;
        Ok(results.into_iter().map(|r| r.chunk).collect())
    }

    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        if self.store.count().await? == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_one(query).await?;
        self.store.search(&query_embedding, k).await
    }

    /// Irreversibly drop all stored records.
    pub async fn delete_all(&self) -> Result<usize, ApiError> {
        self.store.clear_all().await
    }

    /// Cardinality and health. Never fails: internal errors degrade to an
    /// error status value.
    pub async fn stats(&self) -> StoreStats {
        match self.store.count().await {
            Ok(count) => StoreStats {
                count,
                status: "active".to_string(),
            },
            Err(err) => StoreStats {
                count: 0,
                status: format!("error: {}", err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::chunker::TextSplitter;
    use crate::llm::testing::ScriptedProvider;
    use crate::rag::SqliteRagStore;
    use std::sync::atomic::Ordering;

    async fn test_vector_store() -> (VectorStore, Arc<ScriptedProvider>) {
        let tmp = std::env::temp_dir().join(format!(
            "context-agent-vs-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        let store = Arc::new(SqliteRagStore::open(tmp).await.unwrap());
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let embedder = Embedder::new(
            provider.clone(),
            "embed".to_string(),
            TextSplitter::new(200, 40),
        );
        (VectorStore::new(store, embedder), provider)
    }

    fn doc(content: &str, source: &str) -> Document {
        let mut metadata = serde_json::Map::new();
        metadata.insert("source".to_string(), serde_json::Value::from(source));
        Document::with_metadata(content, metadata)
    }

    #[tokio::test]
    async fn add_documents_is_noop_on_empty_input() {
        let (vs, provider) = test_vector_store().await;

        assert_eq!(vs.add_documents(&[]).await.unwrap(), 0);
        assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 0);
        assert_eq!(vs.stats().await.count, 0);
    }

    #[tokio::test]
    async fn round_trip_exact_text_is_top_result() {
        let (vs, _provider) = test_vector_store().await;

        vs.add_documents(&[
            doc("the mitochondria is the powerhouse of the cell", "bio.txt"),
            doc("rust ownership prevents data races at compile time", "rust.txt"),
            doc("sourdough needs a mature starter and patience", "bread.txt"),
        ])
        .await
        .unwrap();

        let results = vs
            .similarity_search("rust ownership prevents data races at compile time", 2)
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].source, "rust.txt");
    }

    #[tokio::test]
    async fn empty_store_search_skips_embedding_service() {
        let (vs, provider) = test_vector_store().await;

        let results = vs.similarity_search("anything", 4).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scores_are_non_increasing_and_bounded_by_k() {
        let (vs, _provider) = test_vector_store().await;

        vs.add_documents(&[
            doc("alpha beta gamma", "a.txt"),
            doc("delta epsilon zeta", "b.txt"),
            doc("eta theta iota", "c.txt"),
        ])
        .await
        .unwrap();

        let results = vs
            .similarity_search_with_score("alpha beta", 2)
            .await
            .unwrap();
        assert!(results.len() <= 2);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn delete_all_empties_the_store() {
        let (vs, _provider) = test_vector_store().await;

        vs.add_documents(&[doc("some content", "a.txt")]).await.unwrap();
        assert!(vs.stats().await.count > 0);

        vs.delete_all().await.unwrap();
        let stats = vs.stats().await;
        assert_eq!(stats.count, 0);
        assert_eq!(stats.status, "active");
    }
}
