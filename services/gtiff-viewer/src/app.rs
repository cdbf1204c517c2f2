//! Router assembly.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

/// Build the viewer router over `state`.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Page
        .route("/", get(handlers::page::root_handler))
        .route(
            "/sessions/:id",
            get(handlers::page::page_handler).delete(handlers::api::delete_session_handler),
        )
        // Session API
        .route("/sessions/:id/api/form", get(handlers::api::form_handler))
        .route(
            "/sessions/:id/api/retrieve",
            post(handlers::api::retrieve_handler),
        )
        .route("/sessions/:id/api/cancel", post(handlers::api::cancel_handler))
        .route("/sessions/:id/api/status", get(handlers::api::status_handler))
        .route("/sessions/:id/api/layers", get(handlers::api::layers_handler))
        .route(
            "/sessions/:id/api/layers/:position/image.png",
            get(handlers::api::layer_image_handler),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
