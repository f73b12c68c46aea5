//! List datasets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::pagination::{Paginated, PaginationParams};

/// Query to list datasets with optional filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListDatasetsQuery {
    /// Filter by subject nickname
    pub subject: Option<String>,

    /// Filter by creating username
    pub created_by: Option<String>,

    /// Filter by session number
    pub session_number: Option<i32>,

    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListDatasetsQuery {
    fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }
}

/// One dataset row in a listing
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DatasetSummary {
    pub id: Uuid,
    pub name: String,
    pub collection: String,
    pub filename: String,
    pub file_size: Option<i64>,
    pub subject: String,
    pub created_by: String,
    pub created_datetime: DateTime<Utc>,
    pub session: Uuid,
    pub session_number: i32,
}

/// Errors that can occur when listing datasets
#[derive(Debug, thiserror::Error)]
pub enum ListDatasetsError {
    #[error("Invalid pagination: {0}")]
    InvalidPagination(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Handler for the list-datasets query
#[tracing::instrument(skip(pool, query))]
pub async fn handle(
    pool: PgPool,
    query: ListDatasetsQuery,
) -> Result<Paginated<DatasetSummary>, ListDatasetsError> {
    let pagination = query.pagination();
    pagination
        .validate()
        .map_err(ListDatasetsError::InvalidPagination)?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM datasets d
        JOIN sessions s ON s.id = d.session_id
        JOIN subjects sub ON sub.id = s.subject_id
        JOIN users u ON u.id = d.created_by
        WHERE ($1::TEXT IS NULL OR sub.nickname = $1)
          AND ($2::TEXT IS NULL OR u.username = $2)
          AND ($3::INT IS NULL OR s.number = $3)
        "#,
    )
    .bind(&query.subject)
    .bind(&query.created_by)
    .bind(query.session_number)
    .fetch_one(&pool)
    .await?;

    let items = sqlx::query_as::<_, DatasetSummary>(
        r#"
        SELECT d.id, d.name, d.collection, d.filename, d.file_size,
               sub.nickname AS subject, u.username AS created_by,
               d.created_at AS created_datetime,
               s.id AS session, s.number AS session_number
        FROM datasets d
        JOIN sessions s ON s.id = d.session_id
        JOIN subjects sub ON sub.id = s.subject_id
        JOIN users u ON u.id = d.created_by
        WHERE ($1::TEXT IS NULL OR sub.nickname = $1)
          AND ($2::TEXT IS NULL OR u.username = $2)
          AND ($3::INT IS NULL OR s.number = $3)
        ORDER BY d.created_at DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(&query.subject)
    .bind(&query.created_by)
    .bind(query.session_number)
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
    fn test_query_deserializes_filters() {
        let query: ListDatasetsQuery = serde_json::from_value(serde_json::json!({
            "subject": "mouse1",
            "session_number": 2
        }))
        .unwrap();
        assert_eq!(query.subject.as_deref(), Some("mouse1"));
        assert_eq!(query.session_number, Some(2));
        assert!(query.created_by.is_none());
    }
}
