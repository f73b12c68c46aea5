//! Repository query handlers

pub mod get;
pub mod list;

pub use get::{GetRepositoryError, GetRepositoryQuery};
pub use list::{ListRepositoriesError, ListRepositoriesQuery};
