// src/api.rs

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use color_eyre::eyre::{Result, WrapErr};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::config::ScanRequest;
use crate::core::error::InputError;
use crate::core::models::ScanReport;
use crate::core::orchestrator::Orchestrator;

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/scan/domain", post(scan_domain_handler))
        .with_state(orchestrator)
}

/// Binds `addr` and serves the API until the process is stopped.
pub async fn serve(addr: SocketAddr, orchestrator: Arc<Orchestrator>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, backend = orchestrator.backend().name(), "API listening.");
    axum::serve(listener, create_router(orchestrator))
        .await
        .wrap_err("API server stopped unexpectedly")
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn scan_domain_handler(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanReport>, ApiError> {
    let Json(request) = payload?;
    info!(domain = %request.domain, "Scan requested over the API.");
    let report = orchestrator.scan_request(request).await?;
    Ok(Json(report))
}

#[derive(Debug)]
enum ApiError {
    InvalidInput(String),
}

impl From<InputError> for ApiError {
    fn from(e: InputError) -> Self {
        ApiError::InvalidInput(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };
        warn!(status = status.as_u16(), error = %message, "API request rejected.");

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
