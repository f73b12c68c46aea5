//! Database integration tests
//!
//! Exercise registration, reconciliation, and download metering against a
//! real Postgres instance with migrations applied. Coverage includes:
//!
//! - Session find-or-create on the (subject, date, number) triple
//! - Dataset upsert (re-registration never duplicates)
//! - File record fan-out and the monotone exists flag
//! - Origin repository always targeted
//! - Per-filename error isolation (null entry, batch continues)
//! - Dry-run vs live reconciliation, and the `POST /sync` body contract
//! - Download counting per (dataset, user) pair, lookup by id, min-count filter

use axum::body::Body;
use axum::http::{Request, StatusCode};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use labbook_server::features::downloads::commands::{log_download, LogDownloadCommand};
use labbook_server::features::downloads::queries::{
    self as download_queries, GetDownloadError, GetDownloadQuery, ListDownloadsQuery,
};
use labbook_server::features::registration::commands::{register_files, RegisterFilesCommand};
use labbook_server::features::shared::lists::StringList;
use labbook_server::features::sync::commands::{reconcile, ReconcileCommand};
use labbook_server::features::sync::{sync_routes, SyncState};
use labbook_server::storage::{FilesystemProbe, StorageConfig};

struct Fixture {
    user: String,
    subject: String,
    lab: String,
    lab_repo: String,
    origin_repo: String,
}

/// Seed a user, a lab with one archive repository, an origin repository
/// outside any lab, and a subject homed in the lab.
async fn seed(pool: &PgPool) -> sqlx::Result<Fixture> {
    let fixture = Fixture {
        user: "olivier".to_string(),
        subject: "mouse1".to_string(),
        lab: "cortexlab".to_string(),
        lab_repo: "archive-01".to_string(),
        origin_repo: "acquisition-rig".to_string(),
    };

    sqlx::query("INSERT INTO users (username) VALUES ($1)")
        .bind(&fixture.user)
        .execute(pool)
        .await?;

    let lab_id: (Uuid,) = sqlx::query_as("INSERT INTO labs (name) VALUES ($1) RETURNING id")
        .bind(&fixture.lab)
        .fetch_one(pool)
        .await?;

    let repo_id: (Uuid,) =
        sqlx::query_as("INSERT INTO data_repositories (name) VALUES ($1) RETURNING id")
            .bind(&fixture.lab_repo)
            .fetch_one(pool)
            .await?;

    sqlx::query("INSERT INTO lab_repositories (lab_id, repository_id) VALUES ($1, $2)")
        .bind(lab_id.0)
        .bind(repo_id.0)
        .execute(pool)
        .await?;

    sqlx::query("INSERT INTO data_repositories (name, hostname) VALUES ($1, $2)")
        .bind(&fixture.origin_repo)
        .bind("rig-pc-01")
        .execute(pool)
        .await?;

    sqlx::query("INSERT INTO subjects (nickname, lab_id) VALUES ($1, $2)")
        .bind(&fixture.subject)
        .bind(lab_id.0)
        .execute(pool)
        .await?;

    Ok(fixture)
}

fn register_command(fixture: &Fixture, filenames: &[&str]) -> RegisterFilesCommand {
    RegisterFilesCommand {
        created_by: Some(fixture.user.clone()),
        name: Some(fixture.origin_repo.clone()),
        hostname: None,
        path: format!("{}/2021-03-04/002/alf", fixture.subject),
        filenames: StringList::Many(filenames.iter().map(|s| s.to_string()).collect()),
        labs: StringList::Many(vec![fixture.lab.clone()]),
        projects: StringList::default(),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_register_files_creates_session_datasets_and_records(
    pool: PgPool,
) -> sqlx::Result<()> {
    let fixture = seed(&pool).await?;

    let command = register_command(&fixture, &["spikes.times.npy", "spikes.clusters.npy"]);
    let response = register_files::handle(pool.clone(), command).await.unwrap();

    assert_eq!(response.len(), 2);
    let first = response[0].as_ref().unwrap();
    assert_eq!(first.subject, "mouse1");
    assert_eq!(first.session_number, 2);
    assert_eq!(first.data_format, "npy");
    assert_eq!(first.created_by, "olivier");
    assert_eq!(first.session_users, "olivier");
    assert_eq!(
        first.name,
        "mouse1/2021-03-04/002/alf/spikes.times.npy"
    );

    // Fans out to the lab's archive and the origin rig.
    assert_eq!(first.file_records.len(), 2);
    let repos: Vec<&str> = first
        .file_records
        .iter()
        .map(|fr| fr.data_repository.as_str())
        .collect();
    assert!(repos.contains(&"archive-01"));
    assert!(repos.contains(&"acquisition-rig"));

    // The origin assertion marks only the rig copy as present.
    for record in &first.file_records {
        let expected = record.data_repository == "acquisition-rig";
        assert_eq!(record.exists, expected, "{}", record.data_repository);
    }

    let sessions: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
        .fetch_one(&pool)
        .await?;
    assert_eq!(sessions.0, 1);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_repeated_registration_reuses_session_and_dataset(pool: PgPool) -> sqlx::Result<()> {
    let fixture = seed(&pool).await?;

    let first = register_files::handle(pool.clone(), register_command(&fixture, &["spikes.npy"]))
        .await
        .unwrap();
    let second = register_files::handle(pool.clone(), register_command(&fixture, &["spikes.npy"]))
        .await
        .unwrap();

    let a = first[0].as_ref().unwrap();
    let b = second[0].as_ref().unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(a.session, b.session);

    let sessions: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
        .fetch_one(&pool)
        .await?;
    assert_eq!(sessions.0, 1);

    let datasets: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM datasets")
        .fetch_one(&pool)
        .await?;
    assert_eq!(datasets.0, 1);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_exists_flag_never_reverts(pool: PgPool) -> sqlx::Result<()> {
    let fixture = seed(&pool).await?;

    // First registration asserts presence at the origin rig.
    register_files::handle(pool.clone(), register_command(&fixture, &["spikes.npy"]))
        .await
        .unwrap();

    // Second registration names no origin, so nothing is asserted present.
    let mut command = register_command(&fixture, &["spikes.npy"]);
    command.name = None;
    let response = register_files::handle(pool.clone(), command).await.unwrap();

    let dataset = response[0].as_ref().unwrap();
    let rig_record = dataset
        .file_records
        .iter()
        .find(|fr| fr.data_repository == "acquisition-rig")
        .unwrap();
    assert!(rig_record.exists, "verified record must stay verified");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_malformed_path_aborts_whole_request(pool: PgPool) -> sqlx::Result<()> {
    let fixture = seed(&pool).await?;

    let mut command = register_command(&fixture, &["spikes.npy"]);
    command.path = "mouse1-2021-03-04-002".to_string();

    let result = register_files::handle(pool.clone(), command).await;
    assert!(result.is_err());

    let datasets: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM datasets")
        .fetch_one(&pool)
        .await?;
    assert_eq!(datasets.0, 0);
    let sessions: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
        .fetch_one(&pool)
        .await?;
    assert_eq!(sessions.0, 0);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_unknown_extension_falls_back_to_default_format(pool: PgPool) -> sqlx::Result<()> {
    let fixture = seed(&pool).await?;

    let response =
        register_files::handle(pool.clone(), register_command(&fixture, &["notes.xyz"]))
            .await
            .unwrap();

    let dataset = response[0].as_ref().unwrap();
    assert_eq!(dataset.data_format, "unknown");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_reconcile_dry_run_then_live(pool: PgPool) -> sqlx::Result<()> {
    let fixture = seed(&pool).await?;

    register_files::handle(
        pool.clone(),
        register_command(&fixture, &["spikes.npy", "clusters.npy"]),
    )
    .await
    .unwrap();

    // Place only spikes.npy in the lab archive on disk.
    let root = tempfile::tempdir().unwrap();
    let session_dir = root
        .path()
        .join("archive-01/mouse1/2021-03-04/002/alf");
    std::fs::create_dir_all(&session_dir).unwrap();
    std::fs::write(session_dir.join("spikes.npy"), b"data").unwrap();

    let probe = Arc::new(FilesystemProbe::new(root.path().to_path_buf()));
    let storage = StorageConfig::default();

    let dry = reconcile::handle(
        pool.clone(),
        probe.clone(),
        &storage,
        ReconcileCommand { dry_run: true },
    )
    .await
    .unwrap();
    assert_eq!(dry.transitioned.get("archive-01"), Some(&1));

    // Dry run must not have updated anything.
    let unverified: (i64,) = sqlx::query_as(
        r#"SELECT COUNT(*) FROM file_records WHERE NOT "exists""#,
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(unverified.0, 2, "archive records stay unverified after dry run");

    let live = reconcile::handle(
        pool.clone(),
        probe,
        &storage,
        ReconcileCommand { dry_run: false },
    )
    .await
    .unwrap();
    assert_eq!(live.transitioned.get("archive-01"), Some(&1));

    let unverified: (i64,) = sqlx::query_as(
        r#"SELECT COUNT(*) FROM file_records WHERE NOT "exists""#,
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(unverified.0, 1, "only clusters.npy remains unverified");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_filename_errors_are_isolated_per_entry(pool: PgPool) -> sqlx::Result<()> {
    let fixture = seed(&pool).await?;

    // Remove the catch-all format so an unmatched extension cannot resolve.
    sqlx::query("DELETE FROM data_formats WHERE file_extension = ''")
        .execute(&pool)
        .await?;

    let response = register_files::handle(
        pool.clone(),
        register_command(&fixture, &["spikes.npy", "notes.xyz"]),
    )
    .await
    .unwrap();

    // The bad filename yields a null entry in its slot; the good one registers.
    assert_eq!(response.len(), 2);
    assert!(response[0].is_some());
    assert!(response[1].is_none());

    let datasets: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM datasets")
        .fetch_one(&pool)
        .await?;
    assert_eq!(datasets.0, 1);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_sync_endpoint_body_is_ok_literal(pool: PgPool) -> sqlx::Result<()> {
    let fixture = seed(&pool).await?;

    register_files::handle(pool.clone(), register_command(&fixture, &["spikes.npy"]))
        .await
        .unwrap();

    let root = tempfile::tempdir().unwrap();
    let session_dir = root
        .path()
        .join("archive-01/mouse1/2021-03-04/002/alf");
    std::fs::create_dir_all(&session_dir).unwrap();
    std::fs::write(session_dir.join("spikes.npy"), b"data").unwrap();

    let app = sync_routes().with_state(SyncState {
        db: pool.clone(),
        probe: Arc::new(FilesystemProbe::new(root.path().to_path_buf())),
        storage: StorageConfig::default(),
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sync")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], br#""ok""#);

    // The pass itself ran live, not dry.
    let unverified: (i64,) = sqlx::query_as(
        r#"SELECT COUNT(*) FROM file_records WHERE NOT "exists""#,
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(unverified.0, 0);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_download_and_min_count_filter(pool: PgPool) -> sqlx::Result<()> {
    let fixture = seed(&pool).await?;

    let response = register_files::handle(pool.clone(), register_command(&fixture, &["spikes.npy"]))
        .await
        .unwrap();
    let dataset_id = response[0].as_ref().unwrap().id;

    let command = || LogDownloadCommand {
        user: Some(fixture.user.clone()),
        datasets: StringList::One(dataset_id.to_string()),
        projects: StringList::default(),
    };

    let mut download_id = Uuid::nil();
    for _ in 0..3 {
        let logged = log_download::handle(pool.clone(), command()).await.unwrap();
        download_id = logged.download[0];
    }

    let view = download_queries::get::handle(pool.clone(), GetDownloadQuery { id: download_id })
        .await
        .unwrap();
    assert_eq!(view.dataset, dataset_id);
    assert_eq!(view.user, fixture.user);
    assert_eq!(view.count, 3);

    let missing =
        download_queries::get::handle(pool.clone(), GetDownloadQuery { id: Uuid::new_v4() }).await;
    assert!(matches!(missing, Err(GetDownloadError::NotFound(_))));

    let at_threshold = download_queries::list::handle(
        pool.clone(),
        ListDownloadsQuery {
            min_count: Some(3),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(at_threshold.items.len(), 1);

    let above_threshold = download_queries::list::handle(
        pool.clone(),
        ListDownloadsQuery {
            min_count: Some(4),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(above_threshold.items.is_empty());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_download_count_matches_calls(pool: PgPool) -> sqlx::Result<()> {
    let fixture = seed(&pool).await?;

    let response = register_files::handle(pool.clone(), register_command(&fixture, &["spikes.npy"]))
        .await
        .unwrap();
    let dataset_id = response[0].as_ref().unwrap().id;

    let command = || LogDownloadCommand {
        user: Some(fixture.user.clone()),
        datasets: StringList::One(dataset_id.to_string()),
        projects: StringList::default(),
    };

    for expected in 1..=3i64 {
        let logged = log_download::handle(pool.clone(), command()).await.unwrap();
        assert_eq!(logged.count, vec![expected]);
    }

    let rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM downloads")
        .fetch_one(&pool)
        .await?;
    assert_eq!(rows.0, 1, "one counter row per (dataset, user)");

    Ok(())
}
