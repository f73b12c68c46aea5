//! Utilities shared by the feature slices

pub mod error_helpers;
pub mod lists;
pub mod pagination;
pub mod validation;
