//! Repository command handlers

pub mod create;

pub use create::{CreateRepositoryCommand, CreateRepositoryError, RepositoryResponse};
