//! Error types for the photo month sorter

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for photo month sorter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the photo month sorter
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capture date '{value}' could not be parsed: {message}")]
    DateUnparseable { value: String, message: String },

    #[error("Source directory is not readable: {path}")]
    SourceNotReadable { path: PathBuf },

    #[error("Failed to create destination directory {path}: {source}")]
    DestinationCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Destination file already exists: {path}")]
    DestinationExists { path: PathBuf },

    #[error("Invalid source filename: {path}")]
    InvalidFileName { path: PathBuf },

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
