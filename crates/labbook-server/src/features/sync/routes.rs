//! Sync API routes
//!
//! - `POST /sync` - Run a live reconciliation pass
//! - `POST /sync-status` - Run a dry-run pass and return the report

use crate::api::response::ErrorResponse;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use super::commands::{reconcile, ReconcileCommand, ReconcileError};
use super::SyncState;

/// Creates the sync router
pub fn sync_routes() -> Router<SyncState> {
    Router::new()
        .route("/sync", post(run_sync))
        .route("/sync-status", post(sync_status))
}

/// Run reconciliation, updating confirmed records
///
/// # Endpoint
///
/// `POST /sync`
///
/// # Response
///
/// - `200 OK` - the literal string `"ok"` after the pass completes (legacy
///   acquisition clients compare the body verbatim)
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(state))]
async fn run_sync(State(state): State<SyncState>) -> Result<Response, SyncApiError> {
    let command = ReconcileCommand { dry_run: false };
    let report = reconcile::handle(state.db, state.probe, &state.storage, command).await?;

    tracing::info!(
        transitioned = report.total_transitioned(),
        failures = report.failures.len(),
        "Sync run via API"
    );

    Ok((StatusCode::OK, Json("ok")).into_response())
}

/// Report what reconciliation would do, without updating anything
///
/// # Endpoint
///
/// `POST /sync-status`
///
/// # Response
///
/// - `200 OK` - Per-repository checked/transitioned counts and failures
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(state))]
async fn sync_status(State(state): State<SyncState>) -> Result<Response, SyncApiError> {
    let command = ReconcileCommand { dry_run: true };
    let report = reconcile::handle(state.db, state.probe, &state.storage, command).await?;

    Ok((StatusCode::OK, Json(report)).into_response())
}

/// Unified error type for sync API endpoints
#[derive(Debug)]
struct SyncApiError(ReconcileError);

impl From<ReconcileError> for SyncApiError {
    fn from(err: ReconcileError) -> Self {
        Self(err)
    }
}

impl IntoResponse for SyncApiError {
    fn into_response(self) -> Response {
        match self.0 {
            ReconcileError::Database(_) => {
                tracing::error!("Database error during reconciliation: {}", self.0);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}
