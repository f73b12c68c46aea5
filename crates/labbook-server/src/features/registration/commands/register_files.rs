//! File registration command
//!
//! The fan-out engine behind `POST /register-file`. Shared preconditions
//! (acting user, origin repository, path, subject, labs, session) are
//! resolved once per request; each filename is then upserted independently,
//! producing one dataset and one file record per target repository. A
//! failure on one filename yields a `null` entry and does not abort the
//! batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::registration::directory::{
    find_repository_by_hostname, find_repository_by_name, find_subject_by_nickname,
    find_user_by_username, RepositoryRow, SubjectRow, UserRow,
};
use crate::features::registration::path::{self, InvalidPathFormat};
use crate::features::registration::repositories::{
    resolve_target_repositories, ResolveRepositoriesError,
};
use crate::features::registration::session::{find_or_create_session, SessionRow};
use crate::features::shared::lists::StringList;

/// Command to register files against a session-relative path
///
/// `projects` is accepted as a legacy alias for `labs`, and `hostname` as a
/// legacy way to identify the origin repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterFilesCommand {
    /// Acting username; when absent the route fills it from the `x-user` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    /// Origin repository by unique name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Origin repository by legacy hostname
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Relative directory path following `nickname/YYYY-MM-DD/n[/...]`
    #[serde(default)]
    pub path: String,

    /// Filenames to register under the path
    #[serde(default)]
    pub filenames: StringList,

    /// Lab names whose repositories are the fan-out targets
    #[serde(default)]
    pub labs: StringList,

    /// Legacy alias for `labs`
    #[serde(default)]
    pub projects: StringList,
}

/// Per-repository file record view
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileRecordView {
    pub id: Uuid,
    pub data_repository: String,
    pub relative_path: String,
    pub exists: bool,
}

/// Full dataset view returned per registered filename
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredDataset {
    pub id: Uuid,
    pub name: String,
    pub file_size: Option<i64>,
    pub subject: String,
    pub created_by: String,
    pub created_datetime: DateTime<Utc>,
    pub dataset_type: String,
    pub data_format: String,
    pub session: Uuid,
    pub session_number: i32,
    pub session_users: String,
    pub session_start_time: DateTime<Utc>,
    pub file_records: Vec<FileRecordView>,
}

/// Errors that can occur when registering files
#[derive(Debug, thiserror::Error)]
pub enum RegisterFilesError {
    #[error("The path argument is required")]
    PathRequired,

    #[error(transparent)]
    InvalidPathFormat(#[from] InvalidPathFormat),

    #[error("Subject '{0}' does not exist")]
    SubjectNotFound(String),

    #[error("A user is required: pass created_by or the x-user header")]
    UserRequired,

    #[error("User '{0}' does not exist")]
    UserNotFound(String),

    #[error("Data repository '{0}' does not exist")]
    RepositoryNotFound(String),

    #[error(transparent)]
    Repositories(#[from] ResolveRepositoriesError),

    #[error("No data format matches '{0}' and no default format is seeded")]
    UnknownDataFormat(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Handler for the register-files command
///
/// Resolves the shared preconditions, then registers each filename
/// independently. The returned vector is positionally aligned with the
/// requested filenames; entries are `None` where registration of that one
/// file failed.
#[tracing::instrument(skip(pool, command), fields(path = %command.path))]
pub async fn handle(
    pool: PgPool,
    command: RegisterFilesCommand,
) -> Result<Vec<Option<RegisteredDataset>>, RegisterFilesError> {
    let username = command
        .created_by
        .as_deref()
        .ok_or(RegisterFilesError::UserRequired)?;
    let user = find_user_by_username(&pool, username)
        .await?
        .ok_or_else(|| RegisterFilesError::UserNotFound(username.to_string()))?;

    let origin = resolve_origin_repository(&pool, &command).await?;

    if command.path.trim().is_empty() {
        return Err(RegisterFilesError::PathRequired);
    }
    let rel_dir_path = path::normalize(&command.path);
    let session_path = path::parse_session_path(&rel_dir_path)?;

    let subject = find_subject_by_nickname(&pool, &session_path.nickname)
        .await?
        .ok_or_else(|| RegisterFilesError::SubjectNotFound(session_path.nickname.clone()))?;

    // Legacy clients send lab names under "projects"; both lists are merged.
    let mut lab_names = command.projects.clone().into_vec();
    lab_names.extend(command.labs.clone().into_vec());

    let repositories =
        resolve_target_repositories(&pool, &lab_names, subject.lab_id, origin.as_ref()).await?;

    let session = find_or_create_session(
        &pool,
        subject.id,
        session_path.date,
        session_path.number,
        user.id,
    )
    .await?;

    let exists_in: Vec<Uuid> = origin.iter().map(|r| r.id).collect();

    let mut response = Vec::new();
    for filename in command.filenames.into_vec() {
        let registered = register_one(
            &pool,
            &rel_dir_path,
            &filename,
            &session,
            &subject,
            &user,
            &repositories,
            &exists_in,
        )
        .await;

        match registered {
            Ok(dataset) => response.push(Some(dataset)),
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "File registration failed");
                response.push(None);
            },
        }
    }

    Ok(response)
}

async fn resolve_origin_repository(
    pool: &PgPool,
    command: &RegisterFilesCommand,
) -> Result<Option<RepositoryRow>, RegisterFilesError> {
    if let Some(name) = command.name.as_deref() {
        let repo = find_repository_by_name(pool, name)
            .await?
            .ok_or_else(|| RegisterFilesError::RepositoryNotFound(name.to_string()))?;
        return Ok(Some(repo));
    }
    if let Some(hostname) = command.hostname.as_deref() {
        let repo = find_repository_by_hostname(pool, hostname)
            .await?
            .ok_or_else(|| RegisterFilesError::RepositoryNotFound(hostname.to_string()))?;
        return Ok(Some(repo));
    }
    Ok(None)
}

#[derive(Debug, sqlx::FromRow)]
struct DatasetRecord {
    id: Uuid,
    name: String,
    file_size: Option<i64>,
    created_at: DateTime<Utc>,
    created_by: Uuid,
}

#[derive(Debug, sqlx::FromRow)]
struct FormatRecord {
    id: Uuid,
    name: String,
}

#[allow(clippy::too_many_arguments)]
async fn register_one(
    pool: &PgPool,
    rel_dir_path: &str,
    filename: &str,
    session: &SessionRow,
    subject: &SubjectRow,
    user: &UserRow,
    repositories: &[RepositoryRow],
    exists_in: &[Uuid],
) -> Result<RegisteredDataset, RegisterFilesError> {
    let data_format = infer_data_format(pool, filename).await?;
    let dataset_type = infer_dataset_type(pool, filename).await?;
    let dataset_name = format!("{}/{}", rel_dir_path, filename);
    let relative_path = dataset_name.clone();

    // Upsert keyed on (session, collection, filename); the creator of an
    // existing dataset is preserved.
    let dataset = sqlx::query_as::<_, DatasetRecord>(
        r#"
        INSERT INTO datasets
            (session_id, collection, filename, name, data_format_id, dataset_type_id, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (session_id, collection, filename) DO UPDATE
        SET name = EXCLUDED.name,
            data_format_id = EXCLUDED.data_format_id,
            dataset_type_id = EXCLUDED.dataset_type_id,
            updated_at = NOW()
        RETURNING id, name, file_size, created_at, created_by
        "#,
    )
    .bind(session.id)
    .bind(rel_dir_path)
    .bind(filename)
    .bind(&dataset_name)
    .bind(data_format.id)
    .bind(dataset_type.as_ref().map(|t| t.id))
    .bind(user.id)
    .fetch_one(pool)
    .await?;

    for repository in repositories {
        let asserted_present = exists_in.contains(&repository.id);
        sqlx::query(
            r#"
            INSERT INTO file_records (dataset_id, repository_id, relative_path, "exists")
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (dataset_id, repository_id) DO UPDATE
            SET relative_path = EXCLUDED.relative_path,
                "exists" = file_records."exists" OR EXCLUDED."exists"
            "#,
        )
        .bind(dataset.id)
        .bind(repository.id)
        .bind(&relative_path)
        .bind(asserted_present)
        .execute(pool)
        .await?;
    }

    tracing::debug!(
        dataset_id = %dataset.id,
        repositories = repositories.len(),
        "Dataset registered"
    );

    assemble_view(pool, &dataset, session, subject, dataset_type, data_format).await
}

/// Map the filename suffix to a data format, falling back to the seeded
/// default (empty extension)
async fn infer_data_format(
    pool: &PgPool,
    filename: &str,
) -> Result<FormatRecord, RegisterFilesError> {
    let extension = filename
        .rfind('.')
        .map(|idx| &filename[idx..])
        .unwrap_or("");

    let format = sqlx::query_as::<_, FormatRecord>(
        r#"
        SELECT id, name
        FROM data_formats
        WHERE file_extension IN ($1, '')
        ORDER BY (file_extension <> '') DESC
        LIMIT 1
        "#,
    )
    .bind(extension)
    .fetch_optional(pool)
    .await?;

    format.ok_or_else(|| RegisterFilesError::UnknownDataFormat(filename.to_string()))
}

/// Best-effort dataset type inference: longest type name contained in the
/// filename wins; no match is acceptable
async fn infer_dataset_type(
    pool: &PgPool,
    filename: &str,
) -> Result<Option<FormatRecord>, RegisterFilesError> {
    let dataset_type = sqlx::query_as::<_, FormatRecord>(
        r#"
        SELECT id, name
        FROM dataset_types
        WHERE $1 LIKE '%' || name || '%'
        ORDER BY LENGTH(name) DESC
        LIMIT 1
        "#,
    )
    .bind(filename)
    .fetch_optional(pool)
    .await?;

    Ok(dataset_type)
}

async fn assemble_view(
    pool: &PgPool,
    dataset: &DatasetRecord,
    session: &SessionRow,
    subject: &SubjectRow,
    dataset_type: Option<FormatRecord>,
    data_format: FormatRecord,
) -> Result<RegisteredDataset, RegisterFilesError> {
    let creator: (String,) = sqlx::query_as("SELECT username FROM users WHERE id = $1")
        .bind(dataset.created_by)
        .fetch_one(pool)
        .await?;

    let participants: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT u.username
        FROM users u
        JOIN session_users su ON su.user_id = u.id
        WHERE su.session_id = $1
        ORDER BY u.username
        "#,
    )
    .bind(session.id)
    .fetch_all(pool)
    .await?;

    let file_records = sqlx::query_as::<_, FileRecordView>(
        r#"
        SELECT fr.id, r.name AS data_repository, fr.relative_path, fr."exists"
        FROM file_records fr
        JOIN data_repositories r ON r.id = fr.repository_id
        WHERE fr.dataset_id = $1
        ORDER BY r.name
        "#,
    )
    .bind(dataset.id)
    .fetch_all(pool)
    .await?;

    Ok(RegisteredDataset {
        id: dataset.id,
        name: dataset.name.clone(),
        file_size: dataset.file_size,
        subject: subject.nickname.clone(),
        created_by: creator.0,
        created_datetime: dataset.created_at,
        dataset_type: dataset_type.map(|t| t.name).unwrap_or_default(),
        data_format: data_format.name,
        session: session.id,
        session_number: session.number,
        session_users: participants
            .into_iter()
            .map(|(username,)| username)
            .collect::<Vec<_>>()
            .join(","),
        session_start_time: session.start_time,
        file_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_accepts_string_and_array_lists() {
        let json = r#"{
            "created_by": "olivier",
            "name": "acquisition-rig",
            "path": "mouse1/2021-03-04/002/alf",
            "filenames": "spikes.npy,clusters.npy",
            "labs": ["cortexlab"]
        }"#;
        let command: RegisterFilesCommand = serde_json::from_str(json).unwrap();
        assert_eq!(
            command.filenames.into_vec(),
            vec!["spikes.npy", "clusters.npy"]
        );
        assert_eq!(command.labs.into_vec(), vec!["cortexlab"]);
        assert!(command.projects.into_vec().is_empty());
    }

    #[test]
    fn test_command_legacy_projects_alias() {
        let json = r#"{
            "hostname": "rig-pc-01",
            "path": "ZM_1085/2019-02-12/002/alf",
            "filenames": ["file1"],
            "projects": "cortexlab,churchlandlab"
        }"#;
        let command: RegisterFilesCommand = serde_json::from_str(json).unwrap();
        assert_eq!(
            command.projects.into_vec(),
            vec!["cortexlab", "churchlandlab"]
        );
        assert_eq!(command.hostname.as_deref(), Some("rig-pc-01"));
        assert!(command.created_by.is_none());
    }

    #[test]
    fn test_registered_dataset_wire_shape() {
        let view = RegisteredDataset {
            id: Uuid::nil(),
            name: "mouse1/2021-03-04/002/alf/spikes.npy".to_string(),
            file_size: None,
            subject: "mouse1".to_string(),
            created_by: "olivier".to_string(),
            created_datetime: Utc::now(),
            dataset_type: String::new(),
            data_format: "npy".to_string(),
            session: Uuid::nil(),
            session_number: 2,
            session_users: "nick,olivier".to_string(),
            session_start_time: Utc::now(),
            file_records: vec![],
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["subject"], "mouse1");
        assert_eq!(value["session_number"], 2);
        assert_eq!(value["session_users"], "nick,olivier");
        assert!(value["file_size"].is_null());
    }
}
