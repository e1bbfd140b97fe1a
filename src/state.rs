use std::sync::Arc;

use thiserror::Error;

use crate::agent::AgentRuntime;
use crate::chains::QaChain;
use crate::core::config::{ConfigError, Settings};
use crate::core::errors::ApiError;
use crate::ingest::chunker::TextSplitter;
use crate::ingest::embedder::Embedder;
use crate::ingest::loader::DocumentLoader;
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::memory::MemoryManager;
use crate::rag::{SqliteRagStore, VectorStore};
use crate::tools::{CalculatorTool, SearchTool, ToolRegistry};

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to initialize vector store: {0}")]
    Store(#[source] ApiError),
}

/// Global application state shared across all routes.
///
/// Everything here is constructed once at process start and passed by
/// handle into request handlers; there are no import-time singletons.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub llm: Arc<dyn LlmProvider>,
    pub memory: Arc<MemoryManager>,
    pub vector_store: Arc<VectorStore>,
    pub loader: DocumentLoader,
    pub tools: Arc<ToolRegistry>,
    pub qa_chain: Arc<QaChain>,
    pub agent: Arc<AgentRuntime>,
}

impl AppState {
    /// Wire up providers, stores, chains and tools.
    ///
    /// The vector store reopens its persisted index if one exists at the
    /// configured path, else starts empty. The search tool is registered
    /// only when its credentials are configured.
    pub async fn initialize(settings: Settings) -> Result<Arc<Self>, InitializationError> {
        let settings = Arc::new(settings);

        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(
            settings.openai_base_url.clone(),
            settings.openai_api_key.clone(),
        ));

        let store = Arc::new(
            SqliteRagStore::open(settings.store_db_path())
                .await
                .map_err(InitializationError::Store)?,
        );
        let embedder = Embedder::new(
            llm.clone(),
            settings.embedding_model.clone(),
            TextSplitter::default(),
        );
        let vector_store = Arc::new(VectorStore::new(store, embedder));

        let memory = Arc::new(MemoryManager::new(settings.max_sessions));
        let loader = DocumentLoader::new(settings.max_file_size);

        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(CalculatorTool));
        match settings.search_credentials() {
            Some((api_key, engine_id)) => {
                tools.register(Arc::new(SearchTool::new(api_key, engine_id)));
            }
            None => {
                tracing::info!("Search tool disabled: no search credentials configured");
            }
        }
        let tools = Arc::new(tools);

        let qa_chain = Arc::new(QaChain::new(
            llm.clone(),
            settings.chat_model.clone(),
            vector_store.clone(),
            memory.clone(),
        ));
        let agent = Arc::new(AgentRuntime::new(
            llm.clone(),
            settings.chat_model.clone(),
            tools.clone(),
        ));

        Ok(Arc::new(AppState {
            settings,
            llm,
            memory,
            vector_store,
            loader,
            tools,
            qa_chain,
            agent,
        }))
    }
}
