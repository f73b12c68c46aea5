//! Get a single data repository by name

use sqlx::PgPool;

use crate::features::repositories::commands::RepositoryResponse;

/// Query to fetch one repository by its unique name
#[derive(Debug, Clone)]
pub struct GetRepositoryQuery {
    pub name: String,
}

/// Errors that can occur when fetching a repository
#[derive(Debug, thiserror::Error)]
pub enum GetRepositoryError {
    #[error("Data repository '{0}' does not exist")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Handler for the get-repository query
#[tracing::instrument(skip(pool), fields(name = %query.name))]
pub async fn handle(
    pool: PgPool,
    query: GetRepositoryQuery,
) -> Result<RepositoryResponse, GetRepositoryError> {
    sqlx::query_as::<_, RepositoryResponse>(
        "SELECT id, name, hostname, created_at FROM data_repositories WHERE name = $1",
    )
    .bind(&query.name)
    .fetch_optional(&pool)
    .await?
    .ok_or(GetRepositoryError::NotFound(query.name))
}
