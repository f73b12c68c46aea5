//! Registration API routes
//!
//! - `POST /register-file` - Register files for a session-relative path
//!
//! The response body is a bare JSON array aligned with the requested
//! filenames (legacy acquisition clients depend on that shape), `null` where
//! an individual file failed to register.

use crate::api::response::ErrorResponse;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use sqlx::PgPool;

use super::commands::{RegisterFilesCommand, RegisterFilesError};
use super::repositories::ResolveRepositoriesError;

/// Creates the registration router
pub fn registration_routes() -> Router<PgPool> {
    Router::new().route("/", post(register_files))
}

/// Register one or more files against a session path
///
/// # Endpoint
///
/// `POST /register-file`
///
/// # Request Body
///
/// ```json
/// {
///   "created_by": "olivier",
///   "name": "acquisition-rig",
///   "path": "mouse1/2021-03-04/002/alf",
///   "filenames": ["spikes.times.npy", "spikes.clusters.npy"],
///   "labs": "cortexlab"
/// }
/// ```
///
/// # Response
///
/// - `201 Created` - Array of registered datasets (null per failed file)
/// - `400 Bad Request` - Missing user, path, or malformed path
/// - `404 Not Found` - Unknown user, subject, repository, or lab
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool, headers, command), fields(path = %command.path))]
async fn register_files(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    Json(mut command): Json<RegisterFilesCommand>,
) -> Result<Response, RegistrationApiError> {
    // Acquisition tooling identifies the acting user via a header rather
    // than the body.
    if command.created_by.is_none() {
        command.created_by = headers
            .get("x-user")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
    }

    let response = super::commands::register_files::handle(pool, command).await?;

    tracing::info!(
        registered = response.iter().filter(|d| d.is_some()).count(),
        requested = response.len(),
        "Files registered via API"
    );

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Unified error type for registration API endpoints
#[derive(Debug)]
struct RegistrationApiError(RegisterFilesError);

impl From<RegisterFilesError> for RegistrationApiError {
    fn from(err: RegisterFilesError) -> Self {
        Self(err)
    }
}

impl IntoResponse for RegistrationApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            RegisterFilesError::UserRequired
            | RegisterFilesError::PathRequired
            | RegisterFilesError::InvalidPathFormat(_) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.0.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            RegisterFilesError::UserNotFound(_)
            | RegisterFilesError::SubjectNotFound(_)
            | RegisterFilesError::RepositoryNotFound(_)
            | RegisterFilesError::Repositories(ResolveRepositoriesError::LabNotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.0.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            RegisterFilesError::Repositories(ResolveRepositoriesError::NoRepositoryConfigured) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.0.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            RegisterFilesError::UnknownDataFormat(_) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.0.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            RegisterFilesError::Database(_)
            | RegisterFilesError::Repositories(ResolveRepositoriesError::Database(_)) => {
                tracing::error!("Database error during file registration: {}", self.0);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}
