//! Dataset read surface
//!
//! Read-only listings over datasets and their file records. Writes happen
//! through registration.

pub mod queries;
pub mod routes;

pub use routes::{datasets_routes, file_records_routes};
