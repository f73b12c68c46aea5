//! Directory lookups used by registration
//!
//! Thin typed wrappers over the user/subject/repository tables. The auth
//! layer is an external collaborator; usernames arriving in requests are
//! resolved here.

use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubjectRow {
    pub id: Uuid,
    pub nickname: String,
    pub lab_id: Option<Uuid>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RepositoryRow {
    pub id: Uuid,
    pub name: String,
    pub hostname: Option<String>,
}

pub async fn find_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT id, username FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn find_subject_by_nickname(
    pool: &PgPool,
    nickname: &str,
) -> Result<Option<SubjectRow>, sqlx::Error> {
    sqlx::query_as::<_, SubjectRow>("SELECT id, nickname, lab_id FROM subjects WHERE nickname = $1")
        .bind(nickname)
        .fetch_optional(pool)
        .await
}

/// Look a repository up by its unique name, or by legacy hostname
pub async fn find_repository_by_name(
    pool: &PgPool,
    name: &str,
) -> Result<Option<RepositoryRow>, sqlx::Error> {
    sqlx::query_as::<_, RepositoryRow>(
        "SELECT id, name, hostname FROM data_repositories WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn find_repository_by_hostname(
    pool: &PgPool,
    hostname: &str,
) -> Result<Option<RepositoryRow>, sqlx::Error> {
    sqlx::query_as::<_, RepositoryRow>(
        "SELECT id, name, hostname FROM data_repositories WHERE hostname = $1 ORDER BY name LIMIT 1",
    )
    .bind(hostname)
    .fetch_optional(pool)
    .await
}
