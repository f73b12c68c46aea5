//! List data repositories

use serde::Deserialize;
use sqlx::PgPool;

use crate::features::repositories::commands::RepositoryResponse;
use crate::features::shared::pagination::{Paginated, PaginationParams};

/// Query to list data repositories
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRepositoriesQuery {
    /// Filter by name (case-insensitive partial match)
    pub name_contains: Option<String>,

    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListRepositoriesQuery {
    fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }
}

/// Errors that can occur when listing repositories
#[derive(Debug, thiserror::Error)]
pub enum ListRepositoriesError {
    #[error("Invalid pagination: {0}")]
    InvalidPagination(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Handler for the list-repositories query
#[tracing::instrument(skip(pool, query))]
pub async fn handle(
    pool: PgPool,
    query: ListRepositoriesQuery,
) -> Result<Paginated<RepositoryResponse>, ListRepositoriesError> {
    let pagination = query.pagination();
    pagination
        .validate()
        .map_err(ListRepositoriesError::InvalidPagination)?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM data_repositories
        WHERE ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%')
        "#,
    )
    .bind(&query.name_contains)
    .fetch_one(&pool)
    .await?;

    let items = sqlx::query_as::<_, RepositoryResponse>(
        r#"
        SELECT id, name, hostname, created_at
        FROM data_repositories
        WHERE ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%')
        ORDER BY name
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&query.name_contains)
    .bind(pagination.per_page())
    .bind(pagination.offset())
    .fetch_all(&pool)
    .await?;

    Ok(Paginated::from_items(items, &pagination, total.0))
}
