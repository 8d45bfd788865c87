//! # sage-server
//!
//! HTTP API for the Oracle Sage support assistant.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /api/health` | liveness |
//! | `GET /api/collection` | whether the knowledge base collection exists |
//! | `POST /api/chat` | answer a question with sources |
//! | `POST /api/ingest?filename=...` | ingest an uploaded file (raw body) |
//!
//! Failures are returned as `{"error": ..., "kind": ...}`.

pub mod error;
pub mod rest;
pub mod state;

use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;

pub use error::{ApiError, ErrorBody};
pub use rest::{DEFAULT_MAX_UPLOAD_BYTES, router, router_with_limit};
pub use state::AppState;

/// Serve the API on `addr` until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "oracle sage api listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
