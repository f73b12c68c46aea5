//! Create a data repository

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::error_helpers::map_unique_violation;
use crate::features::shared::validation::{
    validate_hostname, validate_name, HostnameValidationError, NameValidationError,
};

const NAME_MAX_LENGTH: usize = 255;

/// Command to create a data repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRepositoryCommand {
    pub name: String,

    /// Legacy machine identifier for clients that register by hostname
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl CreateRepositoryCommand {
    pub fn validate(&self) -> Result<(), CreateRepositoryError> {
        validate_name(&self.name, NAME_MAX_LENGTH)?;
        if let Some(hostname) = &self.hostname {
            validate_hostname(hostname)?;
        }
        Ok(())
    }
}

/// Repository row as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RepositoryResponse {
    pub id: Uuid,
    pub name: String,
    pub hostname: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Errors that can occur when creating a repository
#[derive(Debug, thiserror::Error)]
pub enum CreateRepositoryError {
    #[error(transparent)]
    Name(#[from] NameValidationError),

    #[error(transparent)]
    Hostname(#[from] HostnameValidationError),

    #[error("Data repository '{0}' already exists")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Handler for the create-repository command
///
/// Uniqueness is enforced by the index on `name`; a duplicate surfaces as a
/// constraint violation rather than a pre-check.
#[tracing::instrument(skip(pool, command), fields(name = %command.name))]
pub async fn handle(
    pool: PgPool,
    command: CreateRepositoryCommand,
) -> Result<RepositoryResponse, CreateRepositoryError> {
    command.validate()?;

    let repository = sqlx::query_as::<_, RepositoryResponse>(
        r#"
        INSERT INTO data_repositories (name, hostname)
        VALUES ($1, $2)
        RETURNING id, name, hostname, created_at
        "#,
    )
    .bind(&command.name)
    .bind(&command.hostname)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        map_unique_violation(
            e,
            CreateRepositoryError::Duplicate(command.name.clone()),
            CreateRepositoryError::Database,
        )
    })?;

    tracing::info!(repository_id = %repository.id, "Data repository created");

    Ok(repository)
}
