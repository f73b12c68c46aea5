//! Download query handlers

pub mod get;
pub mod list;

pub use get::{GetDownloadError, GetDownloadQuery};
pub use list::{DownloadView, ListDownloadsError, ListDownloadsQuery};
