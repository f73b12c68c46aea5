//! List download records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::pagination::{Paginated, PaginationParams};

/// Query to list downloads with optional filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListDownloadsQuery {
    /// Filter by downloading username
    pub user: Option<String>,

    /// Filter by dataset id
    pub dataset: Option<Uuid>,

    /// Only counters at or above this value
    pub min_count: Option<i64>,

    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListDownloadsQuery {
    fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }
}

/// One download counter row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DownloadView {
    pub id: Uuid,
    pub dataset: Uuid,
    pub user: String,
    pub count: i64,
    pub first_download: DateTime<Utc>,
    pub last_download: DateTime<Utc>,
}

/// Errors that can occur when listing downloads
#[derive(Debug, thiserror::Error)]
pub enum ListDownloadsError {
    #[error("Invalid pagination: {0}")]
    InvalidPagination(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Handler for the list-downloads query
#[tracing::instrument(skip(pool, query))]
pub async fn handle(
    pool: PgPool,
    query: ListDownloadsQuery,
) -> Result<Paginated<DownloadView>, ListDownloadsError> {
    let pagination = query.pagination();
    pagination
        .validate()
        .map_err(ListDownloadsError::InvalidPagination)?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM downloads dl
        JOIN users u ON u.id = dl.user_id
        WHERE ($1::TEXT IS NULL OR u.username = $1)
          AND ($2::UUID IS NULL OR dl.dataset_id = $2)
          AND ($3::BIGINT IS NULL OR dl.count >= $3)
        "#,
    )
    .bind(&query.user)
    .bind(query.dataset)
    .bind(query.min_count)
    .fetch_one(&pool)
    .await?;

    let items = sqlx::query_as::<_, DownloadView>(
        r#"
        SELECT dl.id, dl.dataset_id AS dataset, u.username AS "user",
               dl.count, dl.first_download, dl.last_download
        FROM downloads dl
        JOIN users u ON u.id = dl.user_id
        WHERE ($1::TEXT IS NULL OR u.username = $1)
          AND ($2::UUID IS NULL OR dl.dataset_id = $2)
          AND ($3::BIGINT IS NULL OR dl.count >= $3)
        ORDER BY dl.last_download DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(&query.user)
    .bind(query.dataset)
    .bind(query.min_count)
    .bind(pagination.per_page())
    .bind(pagination.offset())
    .fetch_all(&pool)
    .await?;

    Ok(Paginated::from_items(items, &pagination, total.0))
}
