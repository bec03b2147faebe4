//! Advisory Context Engine HTTP Server
//!
//! Axum-based server exposing grounded chat, allocation and market data.
//! A background task keeps the market snapshot fresh; every chat question is
//! wrapped in market data and the user's most similar past turns before it
//! reaches the LLM.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use advisor_context::{ContextAssembler, EngineConfig, MarketDataCache, PolygonFeed, VectorStore};
use advisor_core::{LlmProvider, MemoryTurnLog};
use advisor_runtime::{OllamaConfig, OllamaEmbedder, OllamaProvider};

use crate::handlers::{allocation_handler, chat_handler, health_check, history_handler, market_snapshot};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = EngineConfig::from_env()?;
    let ollama = OllamaConfig::from_env();

    // Initialize LLM provider
    let provider = Arc::new(OllamaProvider::from_config(ollama.clone()));
    match provider.health_check().await {
        Ok(true) => tracing::info!(chat_model = %ollama.chat_model, "✓ Connected to Ollama"),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Ollama not available - chat will fail until it is");
            tracing::warn!("  Make sure Ollama is running: ollama serve");
        }
    }

    // Market data: Polygon when a key is set, fallback snapshot otherwise
    let market = match PolygonFeed::from_config(&config)? {
        Some(feed) => {
            tracing::info!("✓ Polygon feed configured");
            Arc::new(MarketDataCache::new(Arc::new(feed), config.fetch_timeout))
        }
        None => {
            tracing::warn!("⚠ POLYGON_API_KEY not set - serving fallback market data");
            Arc::new(MarketDataCache::fallback_only())
        }
    };
    let refresh = market
        .has_feed()
        .then(|| market.spawn_refresh_loop(config.watch_list.clone(), config.refresh_interval));

    // Retrieval and persistence
    let embedder = Arc::new(OllamaEmbedder::from_config(ollama.clone()));
    let store = Arc::new(VectorStore::from_config(embedder, &config));
    let log = Arc::new(MemoryTurnLog::new());
    let assembler = ContextAssembler::new(market, store, log).with_retrieval_k(config.retrieval_k);

    let state = AppState {
        provider,
        assembler: Arc::new(assembler),
        default_model: ollama.chat_model,
    };

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 advisor server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                  - Health check");
    tracing::info!("  GET  /api/market              - Latest market snapshot");
    tracing::info!("  POST /api/allocation          - Allocation for a profile");
    tracing::info!("  POST /api/chat                - Grounded chat");
    tracing::info!("  GET  /api/history/{{user_id}}   - Conversation history");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = refresh {
        handle.shutdown().await;
    }
    Ok(())
}

/// Build the router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/market", get(market_snapshot))
        // Advisor API
        .route("/api/allocation", post(allocation_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/history/{user_id}", get(history_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        // Without a signal handler the server runs until killed
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
