use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use context_agent::core::config::Settings;
use context_agent::core::logging;
use context_agent::server::router::router;
use context_agent::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Configuration error: {}", err);
            eprintln!("Check your environment (.env): OPENAI_API_KEY must be set.");
            std::process::exit(1);
        }
    };

    logging::init(&settings);

    let state = AppState::initialize(settings).await?;

    tracing::info!("Chat model: {}", state.settings.chat_model);
    tracing::info!("Embedding model: {}", state.settings.embedding_model);
    tracing::info!("Vector store: {}", state.settings.store_db_path().display());

    let bind_addr = format!("{}:{}", state.settings.host, state.settings.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let app: Router = router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
