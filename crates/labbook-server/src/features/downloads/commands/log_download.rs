//! Download metering
//!
//! One row per (dataset, user) pair; repeated downloads bump the counter
//! instead of inserting new rows. Project attribution defaults to the
//! projects of the session's subject when the client names none.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::registration::directory::find_user_by_username;
use crate::features::shared::lists::StringList;

/// Command to record dataset downloads for a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogDownloadCommand {
    /// Downloading username; when absent the route fills it from the
    /// `x-user` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Dataset ids being downloaded
    #[serde(default)]
    pub datasets: StringList,

    /// Projects to attribute the downloads to
    #[serde(default)]
    pub projects: StringList,
}

/// Positionally aligned download ids and running counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogDownloadResponse {
    pub download: Vec<Uuid>,
    pub count: Vec<i64>,
}

/// Errors that can occur when logging downloads
#[derive(Debug, thiserror::Error)]
pub enum LogDownloadError {
    #[error("A user is required: pass user or the x-user header")]
    UserRequired,

    #[error("User '{0}' does not exist")]
    UserNotFound(String),

    #[error("'{0}' is not a valid dataset id")]
    InvalidDatasetId(String),

    #[error("Dataset '{0}' does not exist")]
    DatasetNotFound(Uuid),

    #[error("Project '{0}' does not exist")]
    ProjectNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, sqlx::FromRow)]
struct DownloadRecord {
    id: Uuid,
    count: i64,
}

/// Handler for the log-download command
#[tracing::instrument(skip(pool, command))]
pub async fn handle(
    pool: PgPool,
    command: LogDownloadCommand,
) -> Result<LogDownloadResponse, LogDownloadError> {
    let username = command
        .user
        .as_deref()
        .ok_or(LogDownloadError::UserRequired)?;
    let user = find_user_by_username(&pool, username)
        .await?
        .ok_or_else(|| LogDownloadError::UserNotFound(username.to_string()))?;

    let mut dataset_ids = Vec::new();
    for raw in command.datasets.into_vec() {
        let id = raw
            .parse::<Uuid>()
            .map_err(|_| LogDownloadError::InvalidDatasetId(raw.clone()))?;
        dataset_ids.push(id);
    }

    let project_ids = resolve_project_ids(&pool, command.projects.into_vec()).await?;

    let mut response = LogDownloadResponse {
        download: Vec::with_capacity(dataset_ids.len()),
        count: Vec::with_capacity(dataset_ids.len()),
    };

    for dataset_id in dataset_ids {
        let record = log_one(&pool, dataset_id, user.id, &project_ids).await?;
        response.download.push(record.id);
        response.count.push(record.count);
    }

    tracing::info!(
        user = %user.username,
        datasets = response.download.len(),
        "Downloads logged"
    );

    Ok(response)
}

async fn resolve_project_ids(
    pool: &PgPool,
    names: Vec<String>,
) -> Result<Vec<Uuid>, LogDownloadError> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM projects WHERE name = $1")
            .bind(&name)
            .fetch_optional(pool)
            .await?;
        let (id,) = row.ok_or(LogDownloadError::ProjectNotFound(name))?;
        ids.push(id);
    }
    Ok(ids)
}

async fn log_one(
    pool: &PgPool,
    dataset_id: Uuid,
    user_id: Uuid,
    project_ids: &[Uuid],
) -> Result<DownloadRecord, LogDownloadError> {
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM datasets WHERE id = $1")
        .bind(dataset_id)
        .fetch_optional(pool)
        .await?;
    if exists.is_none() {
        return Err(LogDownloadError::DatasetNotFound(dataset_id));
    }

    let record = sqlx::query_as::<_, DownloadRecord>(
        r#"
        INSERT INTO downloads (dataset_id, user_id, count)
        VALUES ($1, $2, 1)
        ON CONFLICT (dataset_id, user_id) DO UPDATE
        SET count = downloads.count + 1,
            last_download = NOW()
        RETURNING id, count
        "#,
    )
    .bind(dataset_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    // Fall back to the subject's projects when the request named none.
    if project_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO download_projects (download_id, project_id)
            SELECT $1, sp.project_id
            FROM datasets d
            JOIN sessions s ON s.id = d.session_id
            JOIN subject_projects sp ON sp.subject_id = s.subject_id
            WHERE d.id = $2
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(dataset_id)
        .execute(pool)
        .await?;
    } else {
        for project_id in project_ids {
            sqlx::query(
                "INSERT INTO download_projects (download_id, project_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(record.id)
            .bind(project_id)
            .execute(pool)
            .await?;
        }
    }

    Ok(record)
}
