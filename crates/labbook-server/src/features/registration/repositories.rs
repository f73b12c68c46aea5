//! Target repository resolution
//!
//! Registration fans each file out to the repositories of the requested labs
//! (or of the subject's home lab when none are requested). The origin
//! repository supplied with the request is always a target, since it is where
//! the file currently lives, even when its lab was not requested.

use sqlx::PgPool;
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use super::directory::RepositoryRow;

#[derive(Debug, Error)]
pub enum ResolveRepositoriesError {
    #[error("Lab '{0}' does not exist")]
    LabNotFound(String),

    #[error("No data repository is configured for the requested labs or the subject's lab")]
    NoRepositoryConfigured,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Resolve the deduplicated, ordered set of target repositories
///
/// Order is first-seen: repositories of the labs in request order (each lab's
/// set ordered by name), with the origin repository appended last when it is
/// not already present.
#[tracing::instrument(skip(pool, origin), fields(labs = lab_names.len()))]
pub async fn resolve_target_repositories(
    pool: &PgPool,
    lab_names: &[String],
    subject_lab: Option<Uuid>,
    origin: Option<&RepositoryRow>,
) -> Result<Vec<RepositoryRow>, ResolveRepositoriesError> {
    let mut repositories: Vec<RepositoryRow> = Vec::new();
    let mut seen: HashSet<Uuid> = HashSet::new();

    if !lab_names.is_empty() {
        for name in lab_names {
            let lab_id = find_lab_id(pool, name)
                .await?
                .ok_or_else(|| ResolveRepositoriesError::LabNotFound(name.clone()))?;
            append_unique(
                &mut repositories,
                &mut seen,
                lab_repositories(pool, lab_id).await?,
            );
        }
    } else if let Some(lab_id) = subject_lab {
        append_unique(
            &mut repositories,
            &mut seen,
            lab_repositories(pool, lab_id).await?,
        );
    }

    if let Some(origin) = origin {
        append_unique(&mut repositories, &mut seen, vec![origin.clone()]);
    }

    if repositories.is_empty() {
        return Err(ResolveRepositoriesError::NoRepositoryConfigured);
    }

    Ok(repositories)
}

fn append_unique(
    repositories: &mut Vec<RepositoryRow>,
    seen: &mut HashSet<Uuid>,
    batch: Vec<RepositoryRow>,
) {
    for repository in batch {
        if seen.insert(repository.id) {
            repositories.push(repository);
        }
    }
}

async fn find_lab_id(pool: &PgPool, name: &str) -> Result<Option<Uuid>, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM labs WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(id,)| id))
}

async fn lab_repositories(pool: &PgPool, lab_id: Uuid) -> Result<Vec<RepositoryRow>, sqlx::Error> {
    sqlx::query_as::<_, RepositoryRow>(
        r#"
        SELECT r.id, r.name, r.hostname
        FROM data_repositories r
        JOIN lab_repositories lr ON lr.repository_id = r.id
        WHERE lr.lab_id = $1
        ORDER BY r.name
        "#,
    )
    .bind(lab_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str) -> RepositoryRow {
        RepositoryRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            hostname: None,
        }
    }

    #[test]
    fn test_append_unique_preserves_first_seen_order() {
        let a = repo("archive-01");
        let b = repo("archive-02");
        let mut repositories = Vec::new();
        let mut seen = HashSet::new();

        append_unique(&mut repositories, &mut seen, vec![a.clone(), b.clone()]);
        append_unique(&mut repositories, &mut seen, vec![b.clone(), a.clone()]);

        assert_eq!(repositories.len(), 2);
        assert_eq!(repositories[0].name, "archive-01");
        assert_eq!(repositories[1].name, "archive-02");
    }

    #[test]
    fn test_append_unique_appends_new_origin() {
        let a = repo("archive-01");
        let origin = repo("acquisition-rig");
        let mut repositories = Vec::new();
        let mut seen = HashSet::new();

        append_unique(&mut repositories, &mut seen, vec![a]);
        append_unique(&mut repositories, &mut seen, vec![origin.clone()]);

        assert_eq!(repositories.len(), 2);
        assert_eq!(repositories[1].id, origin.id);
    }
}
