// src/main.rs

use std::sync::Arc;

use chrono::Utc;
use logisticare::config::Config;
use logisticare::llm::{ChatClient, LlmService};
use logisticare::quiz::QuizEngine;
use logisticare::routes;
use logisticare::state::AppState;
use logisticare::store::Store;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "logisticare.log");
    let (non_blocking, log_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Err(e) = run(config).await {
        tracing::error!("Fatal: {}", e);
        // Flush the file log before exiting
        drop(log_guard);
        std::process::exit(1);
    }
}

/// Opens the store, builds the engine and serves until shutdown. Any error
/// returned here ends the process with a non-zero status.
async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // A failed migration is fatal
    let store = Store::open(&config.database_url).await.map_err(|e| {
        format!("Failed to open the database at {}: {}", config.database_url, e)
    })?;
    tracing::info!("Database ready at {}", config.database_url);

    let retention = chrono::Duration::days(config.cache_retention_days);
    if let Err(e) = store.cleanup_stale(retention, Utc::now()).await {
        tracing::warn!("Startup cleanup failed: {}", e);
    }

    let client = ChatClient::new(&config.llm)
        .map_err(|e| format!("Failed to build the LLM client: {}", e))?;
    if config.llm.api_key.is_none() {
        tracing::warn!("LLM_API_KEY is not set; generation and AI scoring will fail");
    }
    let llm: Arc<dyn LlmService> = Arc::new(client);

    let engine =
        QuizEngine::new(store.clone(), llm.clone(), config.quiz.clone()).with_driver(true);
    let state = AppState::new(store, config.clone(), llm).with_engine(engine);

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", config.bind_addr, e))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
