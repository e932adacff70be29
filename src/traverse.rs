//! Parallel recursive directory traversal
//!
//! Each directory level is listed with `fs::read_dir` and its children are
//! handed to the rayon pool. A level returns only after every child,
//! including whole subtrees, has been processed.

use crate::cancel::CancellationToken;
use crate::classify::{FailureBucket, GroupKey, classify};
use crate::decode::ImageDecoder;
use crate::error::{Error, Result};
use crate::group::Grouper;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{Level, debug, error, span, warn};

/// Counters collected during traversal
#[derive(Debug, Default)]
pub struct TraversalStats {
    pub directories: AtomicUsize,
    pub files: AtomicUsize,
    pub skipped: AtomicUsize,
}

impl TraversalStats {
    pub fn summary(&self) -> String {
        format!(
            "Directories: {}, Files: {}, Skipped: {}",
            self.directories.load(Ordering::Relaxed),
            self.files.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed)
        )
    }
}

/// Walks a directory tree and files every image into a [`Grouper`]
pub struct Traverser<'a> {
    decoder: &'a dyn ImageDecoder,
    grouper: &'a Grouper,
    cancel: &'a CancellationToken,
    follow_links: bool,
    visited: Mutex<HashSet<PathBuf>>,
    stats: TraversalStats,
}

impl<'a> Traverser<'a> {
    pub fn new(
        decoder: &'a dyn ImageDecoder,
        grouper: &'a Grouper,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            decoder,
            grouper,
            cancel,
            follow_links: false,
            visited: Mutex::new(HashSet::new()),
            stats: TraversalStats::default(),
        }
    }

    /// Descend into symlinked directories, visiting each real directory once
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    /// Traverse `directory` and everything below it
    ///
    /// Fails only if `directory` itself cannot be listed. Runs on the current
    /// rayon pool; call inside `ThreadPool::install` to bound it.
    pub fn traverse(&self, directory: &Path) -> Result<()> {
        let _span = span!(Level::INFO, "traverse", root = %directory.display()).entered();

        let readable = fs::metadata(directory)
            .map(|m| m.is_dir())
            .unwrap_or(false)
            && fs::read_dir(directory).is_ok();
        if !readable {
            return Err(Error::SourceNotReadable {
                path: directory.to_path_buf(),
            });
        }

        self.visit_directory(directory);
        Ok(())
    }

    fn visit_directory(&self, directory: &Path) {
        if self.cancel.is_cancelled() {
            return;
        }
        if !self.mark_visited(directory) {
            warn!(path = %directory.display(), "Directory already visited, skipping link cycle");
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %directory.display(), error = %e, "Failed to list directory");
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        self.stats.directories.fetch_add(1, Ordering::Relaxed);
        debug!(path = %directory.display(), "Scanning directory");

        let children: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    warn!(path = %directory.display(), error = %e, "Directory entry could not be read");
                    self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                    None
                }
            })
            .collect();

        children.into_par_iter().for_each(|child| {
            if self.cancel.is_cancelled() {
                return;
            }
            self.visit_entry(&child);
        });
    }

    fn visit_entry(&self, path: &Path) {
        // Does not follow symlinks, so a dangling link still has a type
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.record_unreadable(path, &e);
                return;
            }
        };

        if metadata.is_dir() {
            self.visit_directory(path);
            return;
        }

        if metadata.file_type().is_symlink() && path.is_dir() {
            if self.follow_links {
                self.visit_directory(path);
            } else {
                debug!(path = %path.display(), "Not following symlinked directory");
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            }
            return;
        }

        self.stats.files.fetch_add(1, Ordering::Relaxed);
        let (key, path) = classify(path, self.decoder).into_parts();
        self.grouper.insert(key, path);
    }

    fn record_unreadable(&self, path: &Path, err: &io::Error) {
        error!(
            path = %path.display(),
            bucket = FailureBucket::Unreadable.as_str(),
            error = %err,
            "Image is not readable (possibly corrupted)"
        );
        self.stats.files.fetch_add(1, Ordering::Relaxed);
        self.grouper
            .insert(GroupKey::Failure(FailureBucket::Unreadable), path.to_path_buf());
    }

    /// Record `directory` as visited; false if it was seen before
    fn mark_visited(&self, directory: &Path) -> bool {
        if !self.follow_links {
            return true;
        }
        let canonical = fs::canonicalize(directory).unwrap_or_else(|_| directory.to_path_buf());
        let mut visited = self.visited.lock().unwrap_or_else(|e| e.into_inner());
        visited.insert(canonical)
    }
}
