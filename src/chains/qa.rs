//! RAG question answering.
//!
//! Two modes share one outcome shape:
//! - conversational: retrieval + session history in a single chat
//!   completion, with the exchange appended to the session afterwards;
//! - stateless: retrieval only, short-circuiting to a fixed reply when
//!   nothing is retrieved.
//!
//! Neither mode lets an error escape: failures degrade to an explanatory
//! answer with `metadata.error` set.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::memory::{MemoryManager, Message, ROLE_AGENT, ROLE_USER};
use crate::rag::{StoredChunk, VectorStore};

pub const DEFAULT_TOP_K: usize = 4;

const NO_DOCUMENTS_ANSWER: &str = "I don't have any relevant documents to answer your question. \
     Please upload some documents first.";

/// Uniform chain result for success and failure paths alike. `metadata`
/// carries an `error` key only on failure.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub answer: String,
    pub sources: Vec<String>,
    pub metadata: Value,
}

pub struct QaChain {
    llm: Arc<dyn LlmProvider>,
    model: String,
    vector_store: Arc<VectorStore>,
    memory: Arc<MemoryManager>,
    top_k: usize,
}

impl QaChain {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        model: String,
        vector_store: Arc<VectorStore>,
        memory: Arc<MemoryManager>,
    ) -> Self {
        Self {
            llm,
            model,
            vector_store,
            memory,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Conversational mode: answer with retrieved context plus session
    /// history, then record the exchange in the session.
    pub async fn get_answer(&self, question: &str, session_id: &str) -> ChatOutcome {
        let session = self.memory.get_session(session_id);
        // Holding the session lock across the call serializes concurrent
        // requests for the same key.
        let mut session = session.lock().await;

        let result = self.answer_with_history(question, session.messages()).await;

        match result {
            Ok((answer, sources, retrieved)) => {
                session.append(ROLE_USER, question);
                session.append(ROLE_AGENT, &answer);

                ChatOutcome {
                    answer,
                    sources,
                    metadata: json!({
                        "model": self.model,
                        "session_id": session_id,
                        "documents_retrieved": retrieved,
                    }),
                }
            }
            Err(err) => error_outcome(&err, json!({ "session_id": session_id })),
        }
    }

    async fn answer_with_history(
        &self,
        question: &str,
        history: &[Message],
    ) -> Result<(String, Vec<String>, usize), ApiError> {
        let chunks = self
            .vector_store
            .similarity_search(question, self.top_k)
            .await?;

        let mut messages = vec![ChatMessage::system(build_context_prompt(&chunks))];
        for message in history {
            if message.role == ROLE_AGENT {
                messages.push(ChatMessage::assistant(&message.content));
            } else {
                messages.push(ChatMessage::user(&message.content));
            }
        }
        messages.push(ChatMessage::user(question));

        let answer = self.llm.chat(ChatRequest::new(messages), &self.model).await?;
        let sources = dedupe_sources(&chunks);
        Ok((answer, sources, chunks.len()))
    }

    /// Stateless mode: no history, and no LLM call at all when retrieval
    /// comes back empty.
    pub async fn get_simple_answer(&self, question: &str) -> ChatOutcome {
        let chunks = match self.vector_store.similarity_search(question, self.top_k).await {
            Ok(chunks) => chunks,
            Err(err) => return error_outcome(&err, json!({})),
        };

        if chunks.is_empty() {
            return ChatOutcome {
                answer: NO_DOCUMENTS_ANSWER.to_string(),
                sources: Vec::new(),
                metadata: json!({
                    "model": self.model,
                    "documents_retrieved": 0,
                }),
            };
        }

        let context = chunks
            .iter()
            .map(|chunk| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Based on the following context, answer the question. If the answer \
             cannot be found in the context, say so.\n\n\
             Context:\n{}\n\nQuestion: {}\n\nAnswer:",
            context, question
        );

        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]);
        match self.llm.chat(request, &self.model).await {
            Ok(answer) => ChatOutcome {
                answer,
                sources: dedupe_sources(&chunks),
                metadata: json!({
                    "model": self.model,
                    "documents_retrieved": chunks.len(),
                }),
            },
            Err(err) => error_outcome(&err, json!({})),
        }
    }
}

fn build_context_prompt(chunks: &[StoredChunk]) -> String {
    if chunks.is_empty() {
        return "You are a helpful assistant. No documents matched the user's \
                question; answer from the conversation alone and say when you \
                do not know."
            .to_string();
    }

    let context = chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a helpful assistant. Use the conversation history and the \
         following context from the user's documents to answer. If the answer \
         cannot be found, say so.\n\nContext:\n{}",
        context
    )
}

/// Source names deduplicated in first-seen order.
fn dedupe_sources(chunks: &[StoredChunk]) -> Vec<String> {
    let mut sources = Vec::new();
    for chunk in chunks {
        if !sources.contains(&chunk.source) {
            sources.push(chunk.source.clone());
        }
    }
    sources
}

fn error_outcome(err: &ApiError, mut metadata: Value) -> ChatOutcome {
    tracing::warn!("QA chain degraded to error answer: {}", err);
    if let Some(map) = metadata.as_object_mut() {
        map.insert("error".to_string(), Value::String(err.to_string()));
    }
    ChatOutcome {
        answer: format!(
            "I encountered an error while processing your question: {}",
            err
        ),
        sources: Vec::new(),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::chunker::TextSplitter;
    use crate::ingest::embedder::Embedder;
    use crate::ingest::Document;
    use crate::llm::testing::ScriptedProvider;
    use crate::rag::SqliteRagStore;
    use std::sync::atomic::Ordering;

    async fn chain_with(
        replies: Vec<&str>,
        documents: &[Document],
    ) -> (QaChain, Arc<ScriptedProvider>, Arc<MemoryManager>) {
        let tmp = std::env::temp_dir().join(format!(
            "context-agent-qa-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        let store = Arc::new(SqliteRagStore::open(tmp).await.unwrap());
        let provider = Arc::new(ScriptedProvider::new(replies));
        let embedder = Embedder::new(
            provider.clone(),
            "embed".to_string(),
            TextSplitter::new(200, 40),
        );
        let vector_store = Arc::new(VectorStore::new(store, embedder));
        vector_store.add_documents(documents).await.unwrap();

        let memory = Arc::new(MemoryManager::new(16));
        let chain = QaChain::new(
            provider.clone(),
            "test-model".to_string(),
            vector_store,
            memory.clone(),
        );
        (chain, provider, memory)
    }

    fn doc(content: &str, source: &str) -> Document {
        let mut metadata = serde_json::Map::new();
        metadata.insert("source".to_string(), serde_json::Value::from(source));
        Document::with_metadata(content, metadata)
    }

    #[tokio::test]
    async fn conversational_mode_records_the_exchange() {
        let (chain, _provider, memory) = chain_with(
            vec!["Paris is the capital."],
            &[doc("France's capital city is Paris.", "geo.txt")],
        )
        .await;

        let outcome = chain.get_answer("What is the capital of France?", "s1").await;
        assert_eq!(outcome.answer, "Paris is the capital.");
        assert_eq!(outcome.sources, vec!["geo.txt".to_string()]);
        assert_eq!(outcome.metadata["session_id"], "s1");
        assert!(outcome.metadata.get("error").is_none());

        let session = memory.get_session("s1");
        let session = session.lock().await;
        assert_eq!(session.len(), 2);
        assert_eq!(session.messages()[0].role, ROLE_USER);
        assert_eq!(session.messages()[1].role, ROLE_AGENT);
        assert_eq!(session.messages()[1].content, "Paris is the capital.");
    }

    #[tokio::test]
    async fn failure_degrades_to_error_answer_and_leaves_session_untouched() {
        let tmp = std::env::temp_dir().join(format!(
            "context-agent-qa-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        let store = Arc::new(SqliteRagStore::open(tmp).await.unwrap());
        let provider = Arc::new(ScriptedProvider::failing());
        let embedder = Embedder::new(
            provider.clone(),
            "embed".to_string(),
            TextSplitter::default(),
        );
        let vector_store = Arc::new(VectorStore::new(store, embedder));
        let memory = Arc::new(MemoryManager::new(16));
        let chain = QaChain::new(
            provider,
            "test-model".to_string(),
            vector_store,
            memory.clone(),
        );

        let outcome = chain.get_answer("anything", "s1").await;
        assert!(outcome.answer.contains("error"));
        assert!(outcome.sources.is_empty());
        assert!(outcome.metadata.get("error").is_some());
        assert!(memory.get_session("s1").lock().await.is_empty());
    }

    #[tokio::test]
    async fn stateless_mode_short_circuits_on_empty_store() {
        let (chain, provider, _memory) = chain_with(vec!["should never be used"], &[]).await;

        let outcome = chain.get_simple_answer("anything at all").await;
        assert_eq!(outcome.answer, NO_DOCUMENTS_ANSWER);
        assert!(outcome.sources.is_empty());
        assert_eq!(provider.chat_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stateless_mode_answers_from_context() {
        let (chain, provider, _memory) = chain_with(
            vec!["Blue, according to the notes."],
            &[doc("The bikeshed shall be blue.", "decisions.txt")],
        )
        .await;

        let outcome = chain.get_simple_answer("What color is the bikeshed?").await;
        assert_eq!(outcome.answer, "Blue, according to the notes.");
        assert_eq!(outcome.sources, vec!["decisions.txt".to_string()]);
        assert_eq!(provider.chat_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sources_dedupe_preserves_first_seen_order() {
        let chunk = |source: &str| StoredChunk {
            chunk_id: uuid::Uuid::new_v4().to_string(),
            content: String::new(),
            source: source.to_string(),
            metadata: None,
        };

        let sources = dedupe_sources(&[chunk("b.txt"), chunk("a.txt"), chunk("b.txt")]);
        assert_eq!(sources, vec!["b.txt".to_string(), "a.txt".to_string()]);
    }
}
