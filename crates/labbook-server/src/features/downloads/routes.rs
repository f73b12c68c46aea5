//! Download API routes
//!
//! - `POST /downloads` - Record dataset downloads for a user
//! - `GET /downloads` - List download counters with filters
//! - `GET /downloads/:id` - Get one download counter

use crate::api::response::{ApiResponse, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::commands::{LogDownloadCommand, LogDownloadError};
use super::queries::{GetDownloadError, GetDownloadQuery, ListDownloadsError, ListDownloadsQuery};

/// Creates the downloads router
pub fn downloads_routes() -> Router<PgPool> {
    Router::new()
        .route("/", post(log_download))
        .route("/", get(list_downloads))
        .route("/:id", get(get_download))
}

/// Record one download per dataset for the acting user
///
/// # Endpoint
///
/// `POST /downloads`
///
/// # Request Body
///
/// ```json
/// {
///   "user": "olivier",
///   "datasets": ["6ba7b810-9dad-11d1-80b4-00c04fd430c8"],
///   "projects": "cortexlab"
/// }
/// ```
///
/// # Response
///
/// - `201 Created` - `{"download": [ids], "count": [running counts]}`
/// - `400 Bad Request` - Missing user or malformed dataset id
/// - `404 Not Found` - Unknown user, dataset, or project
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool, headers, command))]
async fn log_download(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    Json(mut command): Json<LogDownloadCommand>,
) -> Result<Response, DownloadApiError> {
    if command.user.is_none() {
        command.user = headers
            .get("x-user")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
    }

    let response = super::commands::log_download::handle(pool, command).await?;

    tracing::info!(datasets = response.download.len(), "Downloads logged via API");

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// List download counters
///
/// # Endpoint
///
/// `GET /downloads?user=olivier&dataset=<uuid>&min_count=2&page=1&per_page=20`
///
/// # Response
///
/// - `200 OK` - Download rows with pagination metadata
/// - `400 Bad Request` - Invalid pagination
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool, query))]
async fn list_downloads(
    State(pool): State<PgPool>,
    Query(query): Query<ListDownloadsQuery>,
) -> Result<Response, DownloadApiError> {
    let response = super::queries::list::handle(pool, query).await?;

    let meta = json!({ "pagination": response.pagination });
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success_with_meta(response.items, meta)),
    )
        .into_response())
}

/// Get one download counter by id
///
/// # Endpoint
///
/// `GET /downloads/:id`
///
/// # Response
///
/// - `200 OK` - The counter row
/// - `404 Not Found` - Unknown download id
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool), fields(id = %id))]
async fn get_download(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Response, DownloadApiError> {
    let response = super::queries::get::handle(pool, GetDownloadQuery { id }).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// Unified error type for download API endpoints
#[derive(Debug)]
enum DownloadApiError {
    Log(LogDownloadError),
    List(ListDownloadsError),
    Get(GetDownloadError),
}

impl From<LogDownloadError> for DownloadApiError {
    fn from(err: LogDownloadError) -> Self {
        Self::Log(err)
    }
}

impl From<ListDownloadsError> for DownloadApiError {
    fn from(err: ListDownloadsError) -> Self {
        Self::List(err)
    }
}

impl From<GetDownloadError> for DownloadApiError {
    fn from(err: GetDownloadError) -> Self {
        Self::Get(err)
    }
}

impl IntoResponse for DownloadApiError {
    fn into_response(self) -> Response {
        match &self {
            DownloadApiError::Log(LogDownloadError::UserRequired)
            | DownloadApiError::Log(LogDownloadError::InvalidDatasetId(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            DownloadApiError::Log(LogDownloadError::UserNotFound(_))
            | DownloadApiError::Log(LogDownloadError::DatasetNotFound(_))
            | DownloadApiError::Log(LogDownloadError::ProjectNotFound(_))
            | DownloadApiError::Get(GetDownloadError::NotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            DownloadApiError::List(ListDownloadsError::InvalidPagination(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            DownloadApiError::Log(LogDownloadError::Database(_))
            | DownloadApiError::List(ListDownloadsError::Database(_))
            | DownloadApiError::Get(GetDownloadError::Database(_)) => {
                tracing::error!("Database error during download handling: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for DownloadApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Log(e) => write!(f, "{}", e),
            Self::List(e) => write!(f, "{}", e),
            Self::Get(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DownloadApiError::Log(LogDownloadError::UserRequired);
        assert!(err.to_string().contains("user is required"));
    }

    #[test]
    fn test_routes_structure() {
        let router = downloads_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }
}
