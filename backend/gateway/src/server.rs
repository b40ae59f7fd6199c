//! Gateway HTTP server and routing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use heatlens_workflow::UsabilityWorkflow;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};

use crate::{outputs, pages, routes};

/// Two full-size screenshots plus multipart overhead.
const UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub workflow: Arc<UsabilityWorkflow>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(workflow: Arc<UsabilityWorkflow>) -> Self {
        Self {
            workflow,
            started_at: Instant::now(),
        }
    }
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/analysis", get(pages::analysis))
        .route(
            "/upload_heatmap",
            post(routes::upload_heatmap).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/get_analysis", get(routes::get_analysis))
        .route("/outputs/*path", get(outputs::serve_output))
        .route("/api/health", get(routes::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Gateway HTTP server listening on {}", addr);
    serve(listener, state).await
}

/// Serve on an already-bound listener.
pub async fn serve(listener: TcpListener, state: GatewayState) -> Result<()> {
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Gateway HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    } else {
        // Without a signal handler, run until the task is dropped.
        std::future::pending::<()>().await;
    }
}
