//! Operational HTTP surface: health, statistics, and manual triggers.
//!
//! The trigger endpoints invoke the identical service entry points the
//! schedulers call — a manual run has no behavioral difference from a
//! scheduled one.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chime_domain::{ChimeError, NotifyReport, Statistics, SyncReport};
use chrono::Utc;
use serde_json::json;
use tracing::error;

use crate::context::AppContext;
use crate::utils::logging::error_label;

/// Build the admin router over a shared context.
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/admin/stats", get(stats))
        .route("/admin/sync", post(trigger_sync))
        .route("/admin/notify", post(trigger_notify))
        .with_state(ctx)
}

/// Error wrapper rendering the domain taxonomy as an HTTP response.
struct ApiError(ChimeError);

impl From<ChimeError> for ApiError {
    fn from(err: ChimeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ChimeError::NotFound(_) => StatusCode::NOT_FOUND,
            ChimeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ChimeError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error!(kind = error_label(&self.0), error = %self.0, "request failed");

        (status, Json(self.0)).into_response()
    }
}

async fn health(State(ctx): State<Arc<AppContext>>) -> Result<Json<serde_json::Value>, ApiError> {
    ctx.db.health_check()?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn stats(State(ctx): State<Arc<AppContext>>) -> Result<Json<Statistics>, ApiError> {
    Ok(Json(ctx.statistics.collect(Utc::now()).await?))
}

async fn trigger_sync(State(ctx): State<Arc<AppContext>>) -> Result<Json<SyncReport>, ApiError> {
    Ok(Json(ctx.sync_service.run_sync().await?))
}

async fn trigger_notify(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<NotifyReport>, ApiError> {
    Ok(Json(ctx.notify_service.run_notify().await?))
}
