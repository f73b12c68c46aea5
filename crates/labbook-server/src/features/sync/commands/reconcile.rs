//! Existence reconciliation
//!
//! Walks every file record still marked unverified, asks the configured
//! [`RepositoryProbe`] whether the file is physically present, and flips
//! confirmed records to verified. Records the probe cannot confirm stay
//! unverified for the next pass; a repository that errors or times out is
//! reported as a failure without affecting the others.
//!
//! The `exists` flag only ever moves `false -> true` here; nothing in
//! reconciliation un-verifies a record.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::storage::{RepositoryProbe, RepositoryTarget, StorageConfig};

/// Command to reconcile unverified file records against storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileCommand {
    /// Probe and report without updating any record
    #[serde(default)]
    pub dry_run: bool,
}

/// Outcome of a reconciliation pass, keyed by repository name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Whether this pass updated the database
    pub dry_run: bool,

    /// Unverified records examined per repository
    pub checked: BTreeMap<String, i64>,

    /// Records confirmed present per repository (updated unless dry-run)
    pub transitioned: BTreeMap<String, i64>,

    /// Repositories whose probe failed, with the failure reason
    pub failures: BTreeMap<String, String>,
}

impl SyncReport {
    pub fn total_transitioned(&self) -> i64 {
        self.transitioned.values().sum()
    }
}

/// Errors that can occur during reconciliation
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, sqlx::FromRow)]
struct UnverifiedRecord {
    id: Uuid,
    relative_path: String,
    repository_id: Uuid,
    repository_name: String,
    repository_hostname: Option<String>,
}

/// Handler for the reconcile command
///
/// Repositories are probed concurrently up to the configured limit, each
/// under its own deadline so one unreachable repository cannot stall the
/// pass.
#[tracing::instrument(skip(pool, probe, storage), fields(dry_run = command.dry_run))]
pub async fn handle(
    pool: PgPool,
    probe: Arc<dyn RepositoryProbe>,
    storage: &StorageConfig,
    command: ReconcileCommand,
) -> Result<SyncReport, ReconcileError> {
    let unverified = sqlx::query_as::<_, UnverifiedRecord>(
        r#"
        SELECT fr.id, fr.relative_path,
               r.id AS repository_id, r.name AS repository_name,
               r.hostname AS repository_hostname
        FROM file_records fr
        JOIN data_repositories r ON r.id = fr.repository_id
        WHERE NOT fr."exists"
        ORDER BY r.name, fr.relative_path
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let mut by_repository: BTreeMap<String, (RepositoryTarget, Vec<UnverifiedRecord>)> =
        BTreeMap::new();
    for record in unverified {
        by_repository
            .entry(record.repository_name.clone())
            .or_insert_with(|| {
                (
                    RepositoryTarget {
                        id: record.repository_id,
                        name: record.repository_name.clone(),
                        hostname: record.repository_hostname.clone(),
                    },
                    Vec::new(),
                )
            })
            .1
            .push(record);
    }

    let mut report = SyncReport {
        dry_run: command.dry_run,
        ..SyncReport::default()
    };
    for (name, (_, records)) in &by_repository {
        report.checked.insert(name.clone(), records.len() as i64);
    }

    let deadline = Duration::from_secs(storage.timeout_secs);
    let outcomes: Vec<(String, Result<Vec<Uuid>, String>)> = stream::iter(
        by_repository
            .into_values()
            .map(|(target, records)| probe_repository(probe.clone(), target, records, deadline)),
    )
    .buffer_unordered(storage.concurrency)
    .collect()
    .await;

    let mut confirmed: Vec<Uuid> = Vec::new();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(ids) => {
                report.transitioned.insert(name, ids.len() as i64);
                confirmed.extend(ids);
            },
            Err(reason) => {
                tracing::warn!(repository = %name, reason = %reason, "Repository probe failed");
                report.failures.insert(name, reason);
            },
        }
    }

    if !command.dry_run && !confirmed.is_empty() {
        sqlx::query(r#"UPDATE file_records SET "exists" = TRUE WHERE id = ANY($1)"#)
            .bind(&confirmed)
            .execute(&pool)
            .await?;
    }

    tracing::info!(
        transitioned = report.total_transitioned(),
        failures = report.failures.len(),
        dry_run = command.dry_run,
        "Reconciliation pass completed"
    );

    Ok(report)
}

/// Probe every unverified record of one repository under a single deadline
///
/// Returns the ids confirmed present, or the failure reason for the whole
/// repository. An `Ok(false)` probe answer is not a failure; the record just
/// stays unverified.
async fn probe_repository(
    probe: Arc<dyn RepositoryProbe>,
    target: RepositoryTarget,
    records: Vec<UnverifiedRecord>,
    deadline: Duration,
) -> (String, Result<Vec<Uuid>, String>) {
    let name = target.name.clone();

    let run = async {
        let mut confirmed = Vec::new();
        for record in &records {
            match probe.exists(&target, &record.relative_path).await {
                Ok(true) => confirmed.push(record.id),
                Ok(false) => {},
                Err(e) => return Err(e.to_string()),
            }
        }
        Ok(confirmed)
    };

    match tokio::time::timeout(deadline, run).await {
        Ok(outcome) => (name, outcome),
        Err(_) => (
            name,
            Err(format!("Timed out after {} seconds", deadline.as_secs())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ProbeError;
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct FixedProbe {
        present: HashSet<(String, String)>,
        failing: HashSet<String>,
    }

    #[async_trait]
    impl RepositoryProbe for FixedProbe {
        async fn exists(
            &self,
            repository: &RepositoryTarget,
            relative_path: &str,
        ) -> Result<bool, ProbeError> {
            if self.failing.contains(&repository.name) {
                return Err(ProbeError::Unconfigured(repository.name.clone()));
            }
            Ok(self
                .present
                .contains(&(repository.name.clone(), relative_path.to_string())))
        }
    }

    fn record(repo: &str, path: &str) -> UnverifiedRecord {
        UnverifiedRecord {
            id: Uuid::new_v4(),
            relative_path: path.to_string(),
            repository_id: Uuid::new_v4(),
            repository_name: repo.to_string(),
            repository_hostname: None,
        }
    }

    #[tokio::test]
    async fn test_probe_repository_confirms_present_records() {
        let probe = Arc::new(FixedProbe {
            present: [(
                "archive-01".to_string(),
                "mouse1/2021-03-04/002/spikes.npy".to_string(),
            )]
            .into(),
            failing: HashSet::new(),
        });
        let target = RepositoryTarget {
            id: Uuid::new_v4(),
            name: "archive-01".to_string(),
            hostname: None,
        };
        let records = vec![
            record("archive-01", "mouse1/2021-03-04/002/spikes.npy"),
            record("archive-01", "mouse1/2021-03-04/002/clusters.npy"),
        ];
        let expected = records[0].id;

        let (name, outcome) =
            probe_repository(probe, target, records, Duration::from_secs(5)).await;

        assert_eq!(name, "archive-01");
        assert_eq!(outcome.unwrap(), vec![expected]);
    }

    #[tokio::test]
    async fn test_probe_repository_reports_failure() {
        let probe = Arc::new(FixedProbe {
            present: HashSet::new(),
            failing: ["archive-02".to_string()].into(),
        });
        let target = RepositoryTarget {
            id: Uuid::new_v4(),
            name: "archive-02".to_string(),
            hostname: None,
        };
        let records = vec![record("archive-02", "a/b/1/file")];

        let (name, outcome) =
            probe_repository(probe, target, records, Duration::from_secs(5)).await;

        assert_eq!(name, "archive-02");
        assert!(outcome.is_err());
    }

    #[test]
    fn test_report_totals() {
        let mut report = SyncReport::default();
        report.transitioned.insert("archive-01".to_string(), 3);
        report.transitioned.insert("archive-02".to_string(), 2);
        assert_eq!(report.total_transitioned(), 5);
    }

    #[test]
    fn test_report_serializes_repository_keys() {
        let mut report = SyncReport {
            dry_run: true,
            ..SyncReport::default()
        };
        report.checked.insert("archive-01".to_string(), 4);
        report.transitioned.insert("archive-01".to_string(), 1);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["checked"]["archive-01"], 4);
        assert_eq!(value["transitioned"]["archive-01"], 1);
    }
}
