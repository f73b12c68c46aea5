//! Labbook Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging bootstrap for the labbook workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the crate-agnostic [`LabbookError`] and `Result` alias
//! - **Logging**: tracing subscriber initialization shared by every binary

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{LabbookError, Result};
