//! Data repository API routes
//!
//! - `POST /data-repositories` - Create a repository
//! - `GET /data-repositories` - List repositories
//! - `GET /data-repositories/:name` - Get one repository by name

use crate::api::response::{ApiResponse, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;

use super::commands::{CreateRepositoryCommand, CreateRepositoryError};
use super::queries::{
    GetRepositoryError, GetRepositoryQuery, ListRepositoriesError, ListRepositoriesQuery,
};

/// Creates the data-repositories router
pub fn repositories_routes() -> Router<PgPool> {
    Router::new()
        .route("/", post(create_repository))
        .route("/", get(list_repositories))
        .route("/:name", get(get_repository))
}

/// Create a data repository
///
/// # Endpoint
///
/// `POST /data-repositories`
///
/// # Response
///
/// - `201 Created` - Repository created
/// - `400 Bad Request` - Validation error
/// - `409 Conflict` - Repository name already exists
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool, command), fields(name = %command.name))]
async fn create_repository(
    State(pool): State<PgPool>,
    Json(command): Json<CreateRepositoryCommand>,
) -> Result<Response, RepositoryApiError> {
    let response = super::commands::create::handle(pool, command).await?;

    tracing::info!(repository_id = %response.id, "Repository created via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

/// List data repositories
///
/// # Endpoint
///
/// `GET /data-repositories?name_contains=archive&page=1&per_page=20`
#[tracing::instrument(skip(pool, query))]
async fn list_repositories(
    State(pool): State<PgPool>,
    Query(query): Query<ListRepositoriesQuery>,
) -> Result<Response, RepositoryApiError> {
    let response = super::queries::list::handle(pool, query).await?;

    let meta = json!({ "pagination": response.pagination });
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success_with_meta(response.items, meta)),
    )
        .into_response())
}

/// Get one data repository by name
///
/// # Endpoint
///
/// `GET /data-repositories/:name`
#[tracing::instrument(skip(pool), fields(name = %name))]
async fn get_repository(
    State(pool): State<PgPool>,
    Path(name): Path<String>,
) -> Result<Response, RepositoryApiError> {
    let response = super::queries::get::handle(pool, GetRepositoryQuery { name }).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// Unified error type for repository API endpoints
#[derive(Debug)]
enum RepositoryApiError {
    Create(CreateRepositoryError),
    List(ListRepositoriesError),
    Get(GetRepositoryError),
}

impl From<CreateRepositoryError> for RepositoryApiError {
    fn from(err: CreateRepositoryError) -> Self {
        Self::Create(err)
    }
}

impl From<ListRepositoriesError> for RepositoryApiError {
    fn from(err: ListRepositoriesError) -> Self {
        Self::List(err)
    }
}

impl From<GetRepositoryError> for RepositoryApiError {
    fn from(err: GetRepositoryError) -> Self {
        Self::Get(err)
    }
}

impl IntoResponse for RepositoryApiError {
    fn into_response(self) -> Response {
        match &self {
            RepositoryApiError::Create(CreateRepositoryError::Name(_))
            | RepositoryApiError::Create(CreateRepositoryError::Hostname(_))
            | RepositoryApiError::List(ListRepositoriesError::InvalidPagination(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            RepositoryApiError::Create(CreateRepositoryError::Duplicate(_)) => {
                let error = ErrorResponse::new("CONFLICT", self.to_string());
                (StatusCode::CONFLICT, Json(error)).into_response()
            },
            RepositoryApiError::Get(GetRepositoryError::NotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            RepositoryApiError::Create(CreateRepositoryError::Database(_))
            | RepositoryApiError::List(ListRepositoriesError::Database(_))
            | RepositoryApiError::Get(GetRepositoryError::Database(_)) => {
                tracing::error!("Database error during repository handling: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for RepositoryApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create(e) => write!(f, "{}", e),
            Self::List(e) => write!(f, "{}", e),
            Self::Get(e) => write!(f, "{}", e),
        }
    }
}
