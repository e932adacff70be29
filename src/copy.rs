//! Copying grouped files into `{year}_{month}` folders

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::group::Grouper;
use rayon::prelude::*;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const BUFFER_SIZE: usize = 256 * 1024;

/// A file that was copied (or, in a dry run, would be)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// A file that could not be copied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFailure {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub error: String,
}

/// Outcome of a copy pass
#[derive(Debug, Default, Clone)]
pub struct CopyReport {
    pub copied: Vec<CopiedFile>,
    pub failures: Vec<CopyFailure>,
    /// Number of month folders handled
    pub directories: usize,
    pub dry_run: bool,
}

impl CopyReport {
    pub fn summary(&self) -> String {
        format!(
            "Folders: {}, Copied: {}, Failed: {}{}",
            self.directories,
            self.copied.len(),
            self.failures.len(),
            if self.dry_run { " (dry run)" } else { "" }
        )
    }
}

/// Materializes month groups on disk
#[derive(Debug, Clone, Default)]
pub struct Copier {
    overwrite: bool,
    dry_run: bool,
    preserve_mtime: bool,
    cancel: CancellationToken,
}

impl Copier {
    pub fn new() -> Self {
        Self {
            preserve_mtime: true,
            ..Self::default()
        }
    }

    /// Replace existing destination files instead of reporting them
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Only report what would be copied
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn preserve_mtime(mut self, preserve: bool) -> Self {
        self.preserve_mtime = preserve;
        self
    }

    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Copy every month group of `grouper` under `destination_root`
    ///
    /// Failure buckets are skipped. Per-file problems end up in the
    /// report; only an uncreatable `destination_root` is an error.
    pub fn copy(&self, grouper: &Grouper, destination_root: &Path) -> Result<CopyReport> {
        let mut report = CopyReport {
            dry_run: self.dry_run,
            ..CopyReport::default()
        };

        if !self.dry_run {
            fs::create_dir_all(destination_root).map_err(|e| Error::DestinationCreate {
                path: destination_root.to_path_buf(),
                source: e,
            })?;
        }

        for (key, paths) in grouper.snapshot() {
            if key.is_failure() {
                debug!(group = %key, count = paths.len(), "Leaving failure bucket uncopied");
                continue;
            }
            if self.cancel.is_cancelled() {
                warn!("Copy cancelled");
                break;
            }

            let group_dir = destination_root.join(key.to_string());
            report.directories += 1;

            if !self.dry_run
                && let Err(e) = fs::create_dir_all(&group_dir)
            {
                error!(path = %group_dir.display(), error = %e, "Failed to create group folder");
                report
                    .failures
                    .extend(paths.into_iter().map(|source| CopyFailure {
                        source,
                        destination: None,
                        error: e.to_string(),
                    }));
                continue;
            }

            info!(
                destination = %group_dir.display(),
                count = paths.len(),
                "Copying files to {}",
                group_dir.display()
            );

            let results: Vec<std::result::Result<CopiedFile, CopyFailure>> = paths
                .par_iter()
                .filter(|_| !self.cancel.is_cancelled())
                .map(|source| self.copy_one(source, &group_dir))
                .collect();

            for result in results {
                match result {
                    Ok(copied) => report.copied.push(copied),
                    Err(failure) => report.failures.push(failure),
                }
            }
        }

        info!("{}", report.summary());
        Ok(report)
    }

    fn copy_one(
        &self,
        source: &Path,
        group_dir: &Path,
    ) -> std::result::Result<CopiedFile, CopyFailure> {
        let destination = match source.file_name() {
            Some(name) => group_dir.join(name),
            None => {
                let err = Error::InvalidFileName {
                    path: source.to_path_buf(),
                };
                error!(source = %source.display(), error = %err, "Failed to copy file");
                return Err(CopyFailure {
                    source: source.to_path_buf(),
                    destination: None,
                    error: err.to_string(),
                });
            }
        };

        if self.dry_run {
            info!(
                source = %source.display(),
                destination = %destination.display(),
                "Would copy file"
            );
        } else if let Err(e) = self.copy_file(source, &destination) {
            error!(
                source = %source.display(),
                destination = %destination.display(),
                error = %e,
                "Failed to copy file"
            );
            return Err(CopyFailure {
                source: source.to_path_buf(),
                destination: Some(destination),
                error: e.to_string(),
            });
        } else {
            debug!(
                source = %source.display(),
                destination = %destination.display(),
                "Copied file"
            );
        }

        Ok(CopiedFile {
            source: source.to_path_buf(),
            destination,
        })
    }

    /// Copy with buffered I/O, refusing to clobber unless overwriting
    fn copy_file(&self, source: &Path, dest: &Path) -> Result<()> {
        let src_file = File::open(source)?;

        let mut options = OpenOptions::new();
        options.write(true);
        if self.overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let dest_file = options.open(dest).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => Error::DestinationExists {
                path: dest.to_path_buf(),
            },
            _ => Error::Io(e),
        })?;

        if let Err(e) = write_contents(src_file, dest_file) {
            // Drop the partial copy so a rerun does not see a collision
            let _ = fs::remove_file(dest);
            return Err(e.into());
        }

        if self.preserve_mtime
            && let Ok(metadata) = fs::metadata(source)
            && let Ok(mtime) = metadata.modified()
        {
            let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime));
        }

        Ok(())
    }
}

fn write_contents(src_file: File, dest_file: File) -> io::Result<()> {
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, src_file);
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, dest_file);

    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
    }

    writer.flush()
}
