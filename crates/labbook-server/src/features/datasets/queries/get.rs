//! Get a single dataset with its file records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::registration::commands::FileRecordView;

/// Query to fetch one dataset by id
#[derive(Debug, Clone, Deserialize)]
pub struct GetDatasetQuery {
    pub id: Uuid,
}

/// Full dataset view including per-repository file records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDetail {
    pub id: Uuid,
    pub name: String,
    pub collection: String,
    pub filename: String,
    pub file_size: Option<i64>,
    pub subject: String,
    pub created_by: String,
    pub created_datetime: DateTime<Utc>,
    pub dataset_type: Option<String>,
    pub data_format: String,
    pub session: Uuid,
    pub session_number: i32,
    pub file_records: Vec<FileRecordView>,
}

/// Errors that can occur when fetching a dataset
#[derive(Debug, thiserror::Error)]
pub enum GetDatasetError {
    #[error("Dataset '{0}' does not exist")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, sqlx::FromRow)]
struct DatasetHeader {
    id: Uuid,
    name: String,
    collection: String,
    filename: String,
    file_size: Option<i64>,
    subject: String,
    created_by: String,
    created_datetime: DateTime<Utc>,
    dataset_type: Option<String>,
    data_format: String,
    session: Uuid,
    session_number: i32,
}

/// Handler for the get-dataset query
#[tracing::instrument(skip(pool), fields(id = %query.id))]
pub async fn handle(pool: PgPool, query: GetDatasetQuery) -> Result<DatasetDetail, GetDatasetError> {
    let header = sqlx::query_as::<_, DatasetHeader>(
        r#"
        SELECT d.id, d.name, d.collection, d.filename, d.file_size,
               sub.nickname AS subject, u.username AS created_by,
               d.created_at AS created_datetime,
               dt.name AS dataset_type, df.name AS data_format,
               s.id AS session, s.number AS session_number
        FROM datasets d
        JOIN sessions s ON s.id = d.session_id
        JOIN subjects sub ON sub.id = s.subject_id
        JOIN users u ON u.id = d.created_by
        JOIN data_formats df ON df.id = d.data_format_id
        LEFT JOIN dataset_types dt ON dt.id = d.dataset_type_id
        WHERE d.id = $1
        "#,
    )
    .bind(query.id)
    .fetch_optional(&pool)
    .await?
    .ok_or(GetDatasetError::NotFound(query.id))?;

    let file_records = sqlx::query_as::<_, FileRecordView>(
        r#"
        SELECT fr.id, r.name AS data_repository, fr.relative_path, fr."exists"
        FROM file_records fr
        JOIN data_repositories r ON r.id = fr.repository_id
        WHERE fr.dataset_id = $1
        ORDER BY r.name
        "#,
    )
    .bind(header.id)
    .fetch_all(&pool)
    .await?;

    Ok(DatasetDetail {
        id: header.id,
        name: header.name,
        collection: header.collection,
        filename: header.filename,
        file_size: header.file_size,
        subject: header.subject,
        created_by: header.created_by,
        created_datetime: header.created_datetime,
        dataset_type: header.dataset_type,
        data_format: header.data_format,
        session: header.session,
        session_number: header.session_number,
        file_records,
    })
}
