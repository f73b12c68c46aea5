//! Registration command handlers

pub mod register_files;

pub use register_files::{
    FileRecordView, RegisterFilesCommand, RegisterFilesError, RegisteredDataset,
};
