//! Dataset query handlers

pub mod file_records;
pub mod get;
pub mod list;

pub use file_records::{FileRecordRow, ListFileRecordsError, ListFileRecordsQuery};
pub use get::{DatasetDetail, GetDatasetError, GetDatasetQuery};
pub use list::{DatasetSummary, ListDatasetsError, ListDatasetsQuery};
