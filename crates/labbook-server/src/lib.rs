//! Labbook Server Library
//!
//! HTTP backend for laboratory data management: experimental subjects,
//! recording sessions, dataset registration and multi-repository file-record
//! reconciliation.
//!
//! # Overview
//!
//! - **Registration**: `POST /register-file` parses a
//!   `subject/date/number[/...]` relative path, resolves or creates the owning
//!   session and fans each filename out to one file record per target
//!   repository.
//! - **Reconciliation**: `POST /sync` upgrades unverified file records by
//!   probing each repository for actual file presence; `POST /sync-status`
//!   reports the would-be transitions without writing.
//! - **Download metering**: `POST /downloads` counts dataset accesses per
//!   (dataset, user) pair instead of logging unbounded events.
//! - **Directory surface**: plain list/detail endpoints for repositories,
//!   datasets, file records and downloads.
//!
//! # Architecture
//!
//! Features are vertical slices under [`features`], each with `commands/`
//! (writes), `queries/` (reads) and `routes.rs`. Handlers are standalone
//! async functions taking the connection pool and a command struct; every
//! cross-entity invariant (session per triple, dataset per session+path,
//! file record per dataset+repository) is enforced by a unique index plus an
//! upsert-on-conflict, never a check-then-insert.
//!
//! # Example
//!
//! ```no_run
//! use labbook_server::{api, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     api::serve(config).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod middleware;
pub mod storage;

// Re-export commonly used types
pub use error::{AppError, AppResult};
