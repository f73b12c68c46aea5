//! Download command handlers

pub mod log_download;

pub use log_download::{LogDownloadCommand, LogDownloadError, LogDownloadResponse};
