//! Sync command handlers

pub mod reconcile;

pub use reconcile::{ReconcileCommand, ReconcileError, SyncReport};
