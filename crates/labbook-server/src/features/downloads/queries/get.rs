//! Get a single download counter by id

use sqlx::PgPool;
use uuid::Uuid;

use super::list::DownloadView;

/// Query to fetch one download counter
#[derive(Debug, Clone)]
pub struct GetDownloadQuery {
    pub id: Uuid,
}

/// Errors that can occur when fetching a download
#[derive(Debug, thiserror::Error)]
pub enum GetDownloadError {
    #[error("Download '{0}' does not exist")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Handler for the get-download query
#[tracing::instrument(skip(pool), fields(id = %query.id))]
pub async fn handle(pool: PgPool, query: GetDownloadQuery) -> Result<DownloadView, GetDownloadError> {
    sqlx::query_as::<_, DownloadView>(
        r#"
        SELECT dl.id, dl.dataset_id AS dataset, u.username AS "user",
               dl.count, dl.first_download, dl.last_download
        FROM downloads dl
        JOIN users u ON u.id = dl.user_id
        WHERE dl.id = $1
        "#,
    )
    .bind(query.id)
    .fetch_optional(&pool)
    .await?
    .ok_or(GetDownloadError::NotFound(query.id))
}
