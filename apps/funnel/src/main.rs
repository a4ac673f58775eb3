use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use funnel::config::Config;
use funnel::pipeline::log_progress;
use funnel::routes::build_router;
use funnel::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting funnel v{}", env!("CARGO_PKG_VERSION"));

    let (state, progress_rx) = AppState::from_config(config.clone())?;
    info!(
        "Governor: {} concurrent jobs, memory ceiling {:?}",
        config.max_concurrent_jobs, config.max_memory_ratio
    );
    if config.analyzer_urls.is_empty() {
        info!("No analyzers configured; every stage will be reported missing");
    }

    // Progress observer, dispatcher and pattern sweep
    let observer = tokio::spawn(log_progress(progress_rx));
    state.orchestrator.start();
    state.recovery.start_cleanup();

    let orchestrator = state.orchestrator.clone();
    let recovery = state.recovery.clone();

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped; draining pipeline");
    orchestrator.shutdown().await;
    recovery.shutdown().await;
    observer.abort();

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
