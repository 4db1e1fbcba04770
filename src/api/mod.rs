//! API Module
//!
//! HTTP surface of the conversion service. The only shared state is the
//! immutable [`ConverterConfig`] behind an `Arc`.

pub mod convert;
pub mod error;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::ConverterConfig;

/// Create the main API router with all endpoints
pub fn create_router(config: Arc<ConverterConfig>) -> Router {
    let body_limit = config.max_request_body_bytes();

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Conversion endpoints; other methods get a JSON 405
        .route(
            "/convert",
            post(convert::convert_any).fallback(convert::method_not_allowed),
        )
        .route(
            "/convert-html",
            post(convert::convert_html).fallback(convert::method_not_allowed),
        )
        .route(
            "/convert-pdf",
            post(convert::convert_pdf).fallback(convert::method_not_allowed),
        )
        // Add state and middleware
        .with_state(config)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}

/// Serve the router on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, config: Arc<ConverterConfig>) -> std::io::Result<()> {
    let app = create_router(config);
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening on {}", addr);
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
