//! HTTP server setup and process lifecycle.

use crate::config::Config;
use crate::handler::{self, AppState};
use crate::logging;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Build the application router: health endpoint plus the mock dispatch
/// fallback, wrapped in the traffic logger.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .fallback(handler::dispatch)
        .layer(middleware::from_fn(logging::log_traffic))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Run the server until a shutdown signal arrives.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState::new(config));
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
