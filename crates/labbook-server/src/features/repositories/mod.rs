//! Data repository management feature
//!
//! Repositories are the storage locations files fan out to: archive servers,
//! acquisition rigs, lab NAS boxes.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::repositories_routes;
