//! Per-file classification into a month group or a failure bucket

use crate::decode::{DecodeError, ImageDecoder};
use crate::time::{FileTimes, TimeSource, resolve_date};
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Reason a file could not be placed in a month group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureBucket {
    /// The decoder does not recognise the file's format
    UnknownFormat,
    /// The format is known but the content does not follow it
    UnknownContent,
    /// The file could not be read, or its date could not be understood
    Unreadable,
}

impl FailureBucket {
    pub const ALL: [FailureBucket; 3] = [
        FailureBucket::UnknownFormat,
        FailureBucket::UnknownContent,
        FailureBucket::Unreadable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureBucket::UnknownFormat => "UnknownFormat",
            FailureBucket::UnknownContent => "UnknownContent",
            FailureBucket::Unreadable => "Unreadable",
        }
    }

    /// Human readable explanation used in log lines
    pub fn description(&self) -> &'static str {
        match self {
            FailureBucket::UnknownFormat => "Unknown format",
            FailureBucket::UnknownContent => "Image is not in standard format and is unparsable",
            FailureBucket::Unreadable => "Image is not readable (possibly corrupted)",
        }
    }
}

impl From<&DecodeError> for FailureBucket {
    fn from(err: &DecodeError) -> Self {
        match err {
            DecodeError::UnknownFormat(_) => FailureBucket::UnknownFormat,
            DecodeError::InvalidContent(_) => FailureBucket::UnknownContent,
            DecodeError::Io(_) => FailureBucket::Unreadable,
        }
    }
}

/// Key under which a file path is grouped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    /// Capture year and month; rendered as `{year}_{month}`, e.g. `2021_7`
    Month { year: i32, month: u32 },
    /// One of the failure sentinels
    Failure(FailureBucket),
}

impl GroupKey {
    pub fn from_date(date: NaiveDate) -> Self {
        GroupKey::Month {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, GroupKey::Failure(_))
    }
}

impl From<FailureBucket> for GroupKey {
    fn from(bucket: FailureBucket) -> Self {
        GroupKey::Failure(bucket)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Month { year, month } => write!(f, "{}_{}", year, month),
            GroupKey::Failure(bucket) => f.write_str(bucket.as_str()),
        }
    }
}

/// Outcome of classifying one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Dated {
        path: PathBuf,
        date: NaiveDate,
        source: TimeSource,
        key: GroupKey,
    },
    Failed {
        path: PathBuf,
        bucket: FailureBucket,
        reason: String,
    },
}

impl Classification {
    pub fn key(&self) -> GroupKey {
        match self {
            Classification::Dated { key, .. } => *key,
            Classification::Failed { bucket, .. } => GroupKey::Failure(*bucket),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Classification::Dated { path, .. } | Classification::Failed { path, .. } => path,
        }
    }

    pub fn into_parts(self) -> (GroupKey, PathBuf) {
        let key = self.key();
        match self {
            Classification::Dated { path, .. } | Classification::Failed { path, .. } => (key, path),
        }
    }
}

/// Classify a single file
///
/// Every failure is absorbed into a [`Classification::Failed`]; this never
/// returns an error. Logs one line per file.
pub fn classify(path: &Path, decoder: &dyn ImageDecoder) -> Classification {
    let outcome = decoder
        .decode(path)
        .map_err(|e| (FailureBucket::from(&e), e.to_string()))
        .and_then(|image| {
            let times = FileTimes::read(path)
                .map_err(|e| (FailureBucket::Unreadable, e.to_string()))?;
            // An unparseable date string leaves the file unusable like a read error
            resolve_date(image.date_time.as_deref(), &times)
                .map_err(|e| (FailureBucket::Unreadable, e.to_string()))
        });

    match outcome {
        Ok(resolved) => {
            let key = GroupKey::from_date(resolved.date);
            info!(
                path = %path.display(),
                date = %resolved.date,
                source = ?resolved.source,
                group = %key,
                "Classified image"
            );
            Classification::Dated {
                path: path.to_path_buf(),
                date: resolved.date,
                source: resolved.source,
                key,
            }
        }
        Err((bucket, reason)) => {
            error!(
                path = %path.display(),
                bucket = bucket.as_str(),
                reason = %reason,
                "{}",
                bucket.description()
            );
            Classification::Failed {
                path: path.to_path_buf(),
                bucket,
                reason,
            }
        }
    }
}
