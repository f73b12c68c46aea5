//! Existence reconciliation feature
//!
//! Registration records where files *should* live; this feature verifies
//! where they *actually* live and promotes confirmed records to verified.

pub mod commands;
pub mod routes;

use crate::storage::{RepositoryProbe, StorageConfig};
use sqlx::PgPool;
use std::sync::Arc;

pub use routes::sync_routes;

/// State for sync handlers: database plus the configured presence probe
#[derive(Clone)]
pub struct SyncState {
    pub db: PgPool,
    pub probe: Arc<dyn RepositoryProbe>,
    pub storage: StorageConfig,
}
