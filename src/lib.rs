//! Photo Month Sorter - sort photos into year_month folders
//!
//! This library walks a directory tree, resolves the capture date of every
//! image and copies each one into a `{year}_{month}` folder:
//! - EXIF `DateTime` extraction, tolerant of malformed values
//! - File system timestamp fallback for images without a date
//! - Failure buckets for unknown formats, invalid content and unreadable files
//! - Parallel traversal and copying with Rayon

pub mod cancel;
pub mod classify;
pub mod cli;
pub mod config;
pub mod copy;
pub mod decode;
pub mod error;
pub mod group;
pub mod process;
pub mod time;
pub mod traverse;

pub use cancel::CancellationToken;
pub use classify::{Classification, FailureBucket, GroupKey, classify};
pub use cli::Cli;
pub use config::{Config, ConfigError};
pub use copy::{CopyReport, Copier};
pub use decode::{ImageDecoder, StandardDecoder};
pub use error::{Error, Result};
pub use group::Grouper;
pub use process::{Processor, RunSummary};
pub use traverse::Traverser;
