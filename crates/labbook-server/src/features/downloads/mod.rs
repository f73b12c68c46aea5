//! Download metering feature
//!
//! Counts how many times each user has downloaded each dataset, one counter
//! row per (dataset, user) pair, attributed to projects.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::downloads_routes;
