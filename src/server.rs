//! HTTP query surface.
//!
//! `/` and `/status` only read the snapshot cache. `/map-data` runs the
//! pipeline for every request and never touches the cache.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::cache::SnapshotCache;
use crate::error::PipelineError;
use crate::scheduler::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub cache: SnapshotCache,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(cache: SnapshotCache, pipeline: Arc<Pipeline>) -> Self {
        Self { cache, pipeline }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// ISO-8601 time of the last successful publish.
    pub last_update: String,
    pub status: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/status", get(status))
        .route("/map-data", get(map_data))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Full page built from the cached fragment.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let artifact = state.cache.read().await;
    Html(state.pipeline.renderer().wrap(&artifact.html))
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let artifact = state.cache.read().await;
    Json(StatusResponse {
        last_update: artifact.updated_at.to_rfc3339(),
        status: "active",
    })
}

/// Fresh, uncached fragment for the page's periodic refresh.
pub async fn map_data(State(state): State<AppState>) -> Result<Html<String>, PipelineError> {
    Ok(Html(state.pipeline.run().await?))
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match self {
            PipelineError::Aggregation(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!(error = %self, status = status.as_u16(), "On-demand refresh failed");
        (status, format!("map refresh failed: {self}")).into_response()
    }
}
