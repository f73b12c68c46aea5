//! List file records

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::pagination::{Paginated, PaginationParams};

/// Query to list file records with optional filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFileRecordsQuery {
    /// Filter by verification state
    pub exists: Option<bool>,

    /// Filter by dataset id
    pub dataset: Option<Uuid>,

    /// Filter by repository name
    pub data_repository: Option<String>,

    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListFileRecordsQuery {
    fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }
}

/// One file record row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileRecordRow {
    pub id: Uuid,
    pub dataset: Uuid,
    pub data_repository: String,
    pub relative_path: String,
    pub exists: bool,
}

/// Errors that can occur when listing file records
#[derive(Debug, thiserror::Error)]
pub enum ListFileRecordsError {
    #[error("Invalid pagination: {0}")]
    InvalidPagination(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Handler for the list-file-records query
#[tracing::instrument(skip(pool, query))]
pub async fn handle(
    pool: PgPool,
    query: ListFileRecordsQuery,
) -> Result<Paginated<FileRecordRow>, ListFileRecordsError> {
    let pagination = query.pagination();
    pagination
        .validate()
        .map_err(ListFileRecordsError::InvalidPagination)?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM file_records fr
        JOIN data_repositories r ON r.id = fr.repository_id
        WHERE ($1::BOOLEAN IS NULL OR fr."exists" = $1)
          AND ($2::UUID IS NULL OR fr.dataset_id = $2)
          AND ($3::TEXT IS NULL OR r.name = $3)
        "#,
    )
    .bind(query.exists)
    .bind(query.dataset)
    .bind(&query.data_repository)
    .fetch_one(&pool)
    .await?;

    let items = sqlx::query_as::<_, FileRecordRow>(
        r#"
        SELECT fr.id, fr.dataset_id AS dataset, r.name AS data_repository,
               fr.relative_path, fr."exists"
        FROM file_records fr
        JOIN data_repositories r ON r.id = fr.repository_id
        WHERE ($1::BOOLEAN IS NULL OR fr."exists" = $1)
          AND ($2::UUID IS NULL OR fr.dataset_id = $2)
          AND ($3::TEXT IS NULL OR r.name = $3)
        ORDER BY r.name, fr.relative_path
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(query.exists)
    .bind(query.dataset)
    .bind(&query.data_repository)
    .bind(pagination.per_page())
    .bind(pagination.offset())
    .fetch_all(&pool)
    .await?;

    Ok(Paginated::from_items(items, &pagination, total.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_deserializes_exists_filter() {
        let query: ListFileRecordsQuery = serde_json::from_value(serde_json::json!({
            "exists": false,
            "data_repository": "archive-01"
        }))
        .unwrap();
        assert_eq!(query.exists, Some(false));
        assert_eq!(query.data_repository.as_deref(), Some("archive-01"));
    }
}
