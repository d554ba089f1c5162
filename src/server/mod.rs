//! HTTP endpoint
//!
//! - POST /message - one conversation turn
//! - GET /health - liveness check
//!
//! Stateless between requests: the caller round-trips the thread id.

mod error;

pub use error::{ApiError, ApiResult};

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::assistant::is_valid_id;
use crate::config::BridgeConfig;
use crate::run_loop::{AssistantRunLoop, Session};

pub const MESSAGE_REQUIRED: &str = "'message' field is required";
pub const INVALID_THREAD_ID: &str = "'thread_id' must contain only letters, digits, '_' or '-'";

#[derive(Clone)]
pub struct AppState {
    pub run_loop: Arc<AssistantRunLoop>,
}

/// Body of POST /message
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub response: String,
    pub thread_id: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/message", post(message_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until Ctrl-C or SIGTERM
pub async fn run(config: &BridgeConfig, run_loop: Arc<AssistantRunLoop>) -> Result<()> {
    let app = create_router(AppState { run_loop });
    let addr = config.bind_address();

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = on_signal("Ctrl+C", tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => on_signal("SIGTERM", std::future::ready(Err(e))).await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

/// Wait for a signal. A handler that cannot be installed never fires.
async fn on_signal(name: &str, signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        error!("Failed to install {} handler: {}", name, e);
        std::future::pending::<()>().await;
    }
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn message_handler(
    State(state): State<AppState>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let message = request
        .message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::bad_request(MESSAGE_REQUIRED))?;

    let mut session = match request.thread_id.filter(|t| !t.is_empty()) {
        Some(thread_id) if !is_valid_id(&thread_id) => {
            return Err(ApiError::bad_request(INVALID_THREAD_ID));
        }
        Some(thread_id) => Session::with_thread(thread_id),
        None => Session::new(),
    };

    let reply = state
        .run_loop
        .execute(&mut session, &message)
        .await
        .map_err(|e| {
            error!("Turn failed: {}", e);
            ApiError::internal(e.to_string())
        })?;

    Ok(Json(MessageResponse {
        response: reply.text,
        thread_id: reply.thread_id,
    }))
}
