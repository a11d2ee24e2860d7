//! Mirror Insight Engine — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use std::net::SocketAddr;
use std::path::PathBuf;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mirror_insight::api::{self, AppState};
use mirror_insight::bias::{
    start_hot_reload_thread, BiasEngine, BiasHandle, DEFAULT_BIAS_CONFIG_PATH,
    ENV_BIAS_CONFIG_PATH,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mirror_insight=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments. This enables
    // BIAS_CONFIG_PATH / BIAS_THRESHOLD overrides from .env.
    let _ = dotenvy::dotenv();

    init_tracing();

    // --- Initialize the bias classifier ---
    let engine = BiasEngine::from_toml()?;
    let handle = BiasHandle::new(engine);

    // If hot reload is enabled, spawn background watcher
    let path = std::env::var(ENV_BIAS_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_BIAS_CONFIG_PATH));
    start_hot_reload_thread(handle.clone(), path);

    let state = AppState::new(handle);
    let router = api::router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "mirror insight engine listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
