//! Health, readiness and metrics handlers.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub workspace: String,
    pub retrieval: String,
    pub sessions: usize,
}

/// GET /health - Basic health check
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /ready - Workspace root present and retrieval program installed
pub async fn ready_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let workspace = if state.sessions.root().is_dir() {
        "ok".to_string()
    } else {
        format!("error: {} is not a directory", state.sessions.root().display())
    };
    let program = match retrieval::resolve_program(&state.config.retrieval.program) {
        Ok(_) => "ok".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let ready = workspace == "ok" && program == "ok";
    let response = ReadyResponse {
        ready,
        workspace,
        retrieval: program,
        sessions: state.sessions.len().await,
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response)).into_response()
}

/// GET /metrics - Prometheus metrics
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "ok");
    }
}
