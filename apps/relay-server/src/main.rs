//! Vision relay server.
//!
//! Run with: cargo run -p relay-server
//!
//! Then open http://localhost:3000 in your browser. The model server is
//! expected at `LM_BASE_URL` (default `http://localhost:1234/v1`).

mod config;

use std::sync::Arc;

use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vision_relay_core::SessionStore;
use vision_relay_session::{MemoryStore, SessionResolver};
use vision_relay_transport::{AppState, create_chat_router};
use vision_relay_upstream::{ChatBackend, UpstreamClient};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::with_limits(config.store_limits()));
    let backend: Arc<dyn ChatBackend> = Arc::new(
        UpstreamClient::new(&config.upstream()).context("Failed to build upstream client")?,
    );
    let state = AppState::new(SessionResolver::new(store), backend);

    // Build router
    let app = create_chat_router(state, Some(config.static_dir.as_path()))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(
        upstream = %config.base_url,
        model = %config.model,
        static_dir = %config.static_dir.display(),
        max_turns = ?config.max_turns,
        "Web UI on http://localhost:{}",
        config.port
    );

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
