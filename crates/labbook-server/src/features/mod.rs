//! Feature slices
//!
//! Each feature owns its commands, queries, and routes. Everything except
//! sync runs directly off the connection pool; sync also needs the storage
//! probe.

pub mod datasets;
pub mod downloads;
pub mod registration;
pub mod repositories;
pub mod shared;
pub mod sync;

use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;

use crate::storage::{RepositoryProbe, StorageConfig};

/// Everything the feature routers need
#[derive(Clone)]
pub struct FeatureState {
    pub db: PgPool,
    pub probe: Arc<dyn RepositoryProbe>,
    pub storage: StorageConfig,
}

/// Assemble every feature router into one
pub fn router(state: FeatureState) -> Router {
    let sync_state = sync::SyncState {
        db: state.db.clone(),
        probe: state.probe,
        storage: state.storage,
    };

    Router::new()
        .nest(
            "/register-file",
            registration::registration_routes().with_state(state.db.clone()),
        )
        .merge(sync::sync_routes().with_state(sync_state))
        .nest(
            "/downloads",
            downloads::downloads_routes().with_state(state.db.clone()),
        )
        .nest(
            "/datasets",
            datasets::datasets_routes().with_state(state.db.clone()),
        )
        .nest(
            "/file-records",
            datasets::file_records_routes().with_state(state.db.clone()),
        )
        .nest(
            "/data-repositories",
            repositories::repositories_routes().with_state(state.db),
        )
}
