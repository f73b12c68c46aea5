//! Dataset API routes
//!
//! - `GET /datasets` - List datasets with filters and pagination
//! - `GET /datasets/:id` - Get one dataset with its file records
//!
//! The file-records listing is exposed separately via
//! [`file_records_routes`] so it can be mounted at `/file-records`.

use crate::api::response::{ApiResponse, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::queries::{
    GetDatasetError, GetDatasetQuery, ListDatasetsError, ListDatasetsQuery, ListFileRecordsError,
    ListFileRecordsQuery,
};

/// Creates the datasets router
pub fn datasets_routes() -> Router<PgPool> {
    Router::new()
        .route("/", get(list_datasets))
        .route("/:id", get(get_dataset))
}

/// Creates the file-records router
pub fn file_records_routes() -> Router<PgPool> {
    Router::new().route("/", get(list_file_records))
}

/// List datasets
///
/// # Endpoint
///
/// `GET /datasets?subject=mouse1&created_by=olivier&session_number=2`
#[tracing::instrument(skip(pool, query))]
async fn list_datasets(
    State(pool): State<PgPool>,
    Query(query): Query<ListDatasetsQuery>,
) -> Result<Response, DatasetApiError> {
    let response = super::queries::list::handle(pool, query).await?;

    let meta = json!({ "pagination": response.pagination });
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success_with_meta(response.items, meta)),
    )
        .into_response())
}

/// Get one dataset by id
///
/// # Endpoint
///
/// `GET /datasets/:id`
#[tracing::instrument(skip(pool), fields(id = %id))]
async fn get_dataset(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Response, DatasetApiError> {
    let response = super::queries::get::handle(pool, GetDatasetQuery { id }).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// List file records
///
/// # Endpoint
///
/// `GET /file-records?exists=false&data_repository=archive-01`
#[tracing::instrument(skip(pool, query))]
async fn list_file_records(
    State(pool): State<PgPool>,
    Query(query): Query<ListFileRecordsQuery>,
) -> Result<Response, DatasetApiError> {
    let response = super::queries::file_records::handle(pool, query).await?;

    let meta = json!({ "pagination": response.pagination });
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success_with_meta(response.items, meta)),
    )
        .into_response())
}

/// Unified error type for dataset API endpoints
#[derive(Debug)]
enum DatasetApiError {
    List(ListDatasetsError),
    Get(GetDatasetError),
    FileRecords(ListFileRecordsError),
}

impl From<ListDatasetsError> for DatasetApiError {
    fn from(err: ListDatasetsError) -> Self {
        Self::List(err)
    }
}

impl From<GetDatasetError> for DatasetApiError {
    fn from(err: GetDatasetError) -> Self {
        Self::Get(err)
    }
}

impl From<ListFileRecordsError> for DatasetApiError {
    fn from(err: ListFileRecordsError) -> Self {
        Self::FileRecords(err)
    }
}

impl IntoResponse for DatasetApiError {
    fn into_response(self) -> Response {
        match &self {
            DatasetApiError::List(ListDatasetsError::InvalidPagination(_))
            | DatasetApiError::FileRecords(ListFileRecordsError::InvalidPagination(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            DatasetApiError::Get(GetDatasetError::NotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            DatasetApiError::List(ListDatasetsError::Database(_))
            | DatasetApiError::Get(GetDatasetError::Database(_))
            | DatasetApiError::FileRecords(ListFileRecordsError::Database(_)) => {
                tracing::error!("Database error during dataset query: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for DatasetApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List(e) => write!(f, "{}", e),
            Self::Get(e) => write!(f, "{}", e),
            Self::FileRecords(e) => write!(f, "{}", e),
        }
    }
}
