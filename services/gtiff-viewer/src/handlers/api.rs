//! Session API: form definitions, retrieval, status and render passes.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, Path, Query, RawQuery},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use viewer_common::{form_fields, FormField, FormOverrides, ParameterForm, ViewerError};

use crate::error::ApiResult;
use crate::metrics;
use crate::render::{self, RenderOutcome};
use crate::session::RetrievalStatus;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FormResponse {
    pub fields: Vec<FormField>,
    pub values: ParameterForm,
}

/// GET /sessions/:id/api/form
pub async fn form_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<FormResponse>> {
    state.sessions.get(&id).await?;
    let values = state.config.form_defaults.clone();
    Ok(Json(FormResponse {
        fields: form_fields(&values),
        values,
    }))
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub success: bool,
    pub message: String,
    pub stem: String,
    pub elapsed_secs: f64,
}

/// POST /sessions/:id/api/retrieve
///
/// Clears the session's rasters and runs the retrieval program. The work
/// runs in its own task so a dropped connection does not abort it.
#[instrument(skip_all, fields(session_id = %id))]
pub async fn retrieve_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    Json(form): Json<FormOverrides>,
) -> ApiResult<Json<RetrieveResponse>> {
    let session = state.sessions.get(&id).await?;
    let request = form.over(&state.config.form_defaults).to_request()?;
    let guard = session.try_lock_work()?;

    let stem = request.stem.to_string();
    let cancel = session.begin_retrieval(&stem).await;
    let invoker = state.invoker.clone();
    info!(stem = %stem, "Retrieval requested");

    let task = tokio::spawn(async move {
        let _guard = guard;
        let started = Instant::now();
        let result = invoker
            .invoke(&session.workspace, &request, cancel)
            .await
            .map_err(ViewerError::from);
        let elapsed_secs = started.elapsed().as_secs_f64();
        let stem = request.stem.to_string();

        let (status, outcome) = match &result {
            Ok(message) => (
                RetrievalStatus::Succeeded {
                    stem,
                    message: message.clone(),
                    finished_at: Utc::now(),
                    elapsed_secs,
                },
                "succeeded",
            ),
            Err(err) => (
                RetrievalStatus::Failed {
                    stem,
                    error: err.to_string(),
                    code: err.code().to_string(),
                    finished_at: Utc::now(),
                    elapsed_secs,
                },
                retrieval_outcome(err),
            ),
        };
        metrics::record_retrieval(outcome, elapsed_secs);
        session.finish_retrieval(status).await;
        result.map(|message| (message, elapsed_secs))
    });

    let (message, elapsed_secs) = task.await??;
    Ok(Json(RetrieveResponse {
        success: true,
        message,
        stem,
        elapsed_secs,
    }))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// POST /sessions/:id/api/cancel
pub async fn cancel_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CancelResponse>> {
    let session = state.sessions.get(&id).await?;
    let cancelled = session.cancel_retrieval().await;
    if cancelled {
        info!(session_id = %id, "Retrieval cancellation requested");
    }
    Ok(Json(CancelResponse { cancelled }))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub session_id: String,
    pub busy: bool,
    pub retrieval: RetrievalStatus,
    /// Seconds since a running retrieval started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_secs: Option<f64>,
}

/// GET /sessions/:id/api/status
pub async fn status_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let session = state.sessions.get(&id).await?;
    let retrieval = session.status().await;
    let elapsed_secs = match &retrieval {
        RetrievalStatus::Running { started_at, .. } => {
            Some((Utc::now() - *started_at).num_milliseconds() as f64 / 1000.0)
        }
        _ => None,
    };
    Ok(Json(StatusResponse {
        session_id: session.id.to_string(),
        busy: session.is_busy(),
        retrieval,
        elapsed_secs,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct PositionQuery {
    pub position: Option<usize>,
}

/// GET /sessions/:id/api/layers?<form>&position=N
#[instrument(skip_all, fields(session_id = %id))]
pub async fn layers_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    Query(form): Query<FormOverrides>,
    Query(position): Query<PositionQuery>,
    RawQuery(raw_query): RawQuery,
) -> ApiResult<Json<RenderOutcome>> {
    let session = state.sessions.get(&id).await?;
    let guard = session.try_lock_work()?;

    let stem = form.over(&state.config.form_defaults).output_stem();
    let form_query = without_position(raw_query.as_deref().unwrap_or(""));
    let base = format!("/sessions/{}/api/layers", session.id);
    let workspace = session.workspace.clone();
    let limits = state.config.limits;

    let outcome = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        let image_url_for = |position: usize| match form_query.as_str() {
            "" => format!("{}/{}/image.png", base, position),
            query => format!("{}/{}/image.png?{}", base, position, query),
        };
        render::render_pass(&workspace, &stem, position.position, &limits, &image_url_for)
    })
    .await??;

    Ok(Json(outcome))
}

/// GET /sessions/:id/api/layers/:position/image.png?<form>
pub async fn layer_image_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((id, position)): Path<(String, usize)>,
    Query(form): Query<FormOverrides>,
) -> ApiResult<Response> {
    let session = state.sessions.get(&id).await?;
    let guard = session.try_lock_work()?;

    let stem = form.over(&state.config.form_defaults).output_stem();
    let workspace = session.workspace.clone();
    let limits = state.config.limits;

    let png = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        render::render_overlay_png(&workspace, &stem, position, &limits)
    })
    .await??;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        png,
    )
        .into_response())
}

/// DELETE /sessions/:id
pub async fn delete_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.sessions.remove(&id).await?;
    metrics::record_sessions(state.sessions.len().await);
    Ok(StatusCode::NO_CONTENT)
}

fn retrieval_outcome(err: &ViewerError) -> &'static str {
    match err {
        ViewerError::Timeout(_) => "timeout",
        ViewerError::Cancelled => "cancelled",
        ViewerError::RetrievalUnavailable(_) => "unavailable",
        _ => "failed",
    }
}

/// Drop `position=` pairs from an encoded query string.
fn without_position(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty() && *pair != "position" && !pair.starts_with("position="))
        .collect::<Vec<_>>()
        .join("&")
}
