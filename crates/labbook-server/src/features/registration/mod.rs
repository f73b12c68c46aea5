//! File registration feature
//!
//! Turns a session-relative path plus filenames into sessions, datasets, and
//! per-repository file records. Split into:
//!
//! - [`path`] - the `nickname/YYYY-MM-DD/n[/...]` path convention
//! - [`directory`] - user/subject/repository lookups
//! - [`session`] - find-or-create on the (subject, date, number) triple
//! - [`repositories`] - lab-driven target repository resolution
//! - [`commands`] - the register-files fan-out itself

pub mod commands;
pub mod directory;
pub mod path;
pub mod repositories;
pub mod routes;
pub mod session;

pub use routes::registration_routes;
