//! Capture date resolution
//!
//! A file's capture date comes from, in order:
//! - the embedded EXIF `DateTime` value, parsed strictly
//! - the year and month of that value when strict parsing fails
//! - the earlier of the file's creation and modification times

pub mod exif;

use crate::error::Result;
use chrono::{DateTime, Local, NaiveDate};
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, trace};

/// Source of the resolved date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// Full date parsed from embedded metadata
    Metadata,
    /// Year and month recovered from embedded metadata, day set to 1
    MetadataYearMonth,
    /// Earlier of the file system creation and modification times
    FileSystem,
}

/// Result of date resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub source: TimeSource,
}

/// File system timestamps of a single entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
    pub created: SystemTime,
    pub modified: SystemTime,
}

impl FileTimes {
    /// Read timestamps from already fetched metadata
    ///
    /// Platforms without a birth time report the modification time for both.
    pub fn from_metadata(metadata: &fs::Metadata) -> std::io::Result<Self> {
        let modified = metadata.modified()?;
        let created = metadata.created().unwrap_or(modified);
        Ok(Self { created, modified })
    }

    /// Stat `path` and read its timestamps
    pub fn read(path: &Path) -> std::io::Result<Self> {
        Self::from_metadata(&fs::metadata(path)?)
    }

    /// The chronologically earlier timestamp, as a local calendar date
    pub fn earliest_date(&self) -> NaiveDate {
        let earliest = self.created.min(self.modified);
        DateTime::<Local>::from(earliest).date_naive()
    }
}

/// Resolve the capture date of a file
///
/// `metadata` is the embedded date string, if the image carries one. A blank
/// value counts as absent. Fails only when a present value cannot be read
/// even as a year and month.
pub fn resolve_date(metadata: Option<&str>, times: &FileTimes) -> Result<ResolvedDate> {
    let value = metadata
        .map(exif::clean_exif_value)
        .filter(|value| !value.is_empty());

    let Some(value) = value else {
        let date = times.earliest_date();
        trace!(%date, "No embedded date, using file system time");
        return Ok(ResolvedDate {
            date,
            source: TimeSource::FileSystem,
        });
    };

    if let Some(date) = exif::parse_standard(value) {
        return Ok(ResolvedDate {
            date,
            source: TimeSource::Metadata,
        });
    }

    debug!(value, "Embedded date not in a standard layout, keeping year and month");
    let date = exif::parse_year_month(value)?;
    Ok(ResolvedDate {
        date,
        source: TimeSource::MetadataYearMonth,
    })
}
