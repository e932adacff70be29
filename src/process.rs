//! Pipeline entry point
//!
//! Handles the core logic of:
//! - Building a bounded Rayon thread pool
//! - Traversing the source tree and classifying every file
//! - Copying month groups to the destination directory

use crate::cancel::CancellationToken;
use crate::classify::{FailureBucket, GroupKey};
use crate::config::Config;
use crate::copy::{CopyReport, Copier};
use crate::decode::{ImageDecoder, StandardDecoder};
use crate::error::Result;
use crate::group::Grouper;
use crate::traverse::Traverser;
use rayon::ThreadPool;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{Level, info, span, warn};

/// Result of a complete run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Every group after traversal, keys sorted, failure buckets included
    pub groups: Vec<(GroupKey, Vec<PathBuf>)>,
    pub copy: CopyReport,
    pub directories_scanned: usize,
    pub files_seen: usize,
    pub cancelled: bool,
}

impl RunSummary {
    /// Paths that landed in `bucket`
    pub fn failed(&self, bucket: FailureBucket) -> &[PathBuf] {
        self.groups
            .iter()
            .find(|(key, _)| *key == GroupKey::Failure(bucket))
            .map(|(_, paths)| paths.as_slice())
            .unwrap_or(&[])
    }

    /// Month groups only
    pub fn month_groups(&self) -> impl Iterator<Item = &(GroupKey, Vec<PathBuf>)> {
        self.groups.iter().filter(|(key, _)| !key.is_failure())
    }

    pub fn classified_count(&self) -> usize {
        self.month_groups().map(|(_, paths)| paths.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        FailureBucket::ALL
            .iter()
            .map(|bucket| self.failed(*bucket).len())
            .sum()
    }
}

/// Runs the walk, classify and copy pipeline for one configuration
pub struct Processor {
    config: Config,
    pool: ThreadPool,
    decoder: Box<dyn ImageDecoder>,
    cancel: CancellationToken,
}

impl Processor {
    /// Create a new processor with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        Self::with_decoder(config, Box::new(StandardDecoder))
    }

    /// Create a processor that decodes images with `decoder`
    pub fn with_decoder(config: Config, decoder: Box<dyn ImageDecoder>) -> Result<Self> {
        // 0 lets Rayon pick the number of threads
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("sorter-worker-{i}"))
            .build()?;

        Ok(Self {
            config,
            pool,
            decoder,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that stops the run when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the processing pipeline
    pub fn run(&self) -> Result<RunSummary> {
        let _span = span!(Level::INFO, "processor_run").entered();

        info!(source = %self.config.source_dir.display(), "Scanning source directory...");
        let grouper = Grouper::new();
        let traverser = Traverser::new(self.decoder.as_ref(), &grouper, &self.cancel)
            .follow_links(self.config.follow_links);

        self.pool
            .install(|| traverser.traverse(&self.config.source_dir))?;

        let stats = traverser.stats();
        info!("{}", stats.summary());
        let directories_scanned = stats.directories.load(Ordering::Relaxed);
        let files_seen = stats.files.load(Ordering::Relaxed);

        if self.cancel.is_cancelled() {
            warn!("Run cancelled during traversal, nothing copied");
            return Ok(RunSummary {
                groups: grouper.snapshot(),
                copy: CopyReport {
                    dry_run: self.config.dry_run,
                    ..CopyReport::default()
                },
                directories_scanned,
                files_seen,
                cancelled: true,
            });
        }

        info!(destination = %self.config.destination_dir.display(), "Copying grouped files...");
        let copier = Copier::new()
            .overwrite(self.config.overwrite)
            .dry_run(self.config.dry_run)
            .preserve_mtime(self.config.preserve_mtime)
            .cancel_token(self.cancel.clone());
        let copy = self
            .pool
            .install(|| copier.copy(&grouper, &self.config.destination_dir))?;

        Ok(RunSummary {
            groups: grouper.snapshot(),
            copy,
            directories_scanned,
            files_seen,
            cancelled: self.cancel.is_cancelled(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::fixtures;
    use crate::error::Error;
    use chrono::{Local, TimeZone};
    use filetime::FileTime;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn set_mtime(path: &Path, y: i32, m: u32, d: u32) {
        let time = Local.with_ymd_and_hms(y, m, d, 12, 0, 0).single().unwrap();
        filetime::set_file_mtime(path, FileTime::from_unix_time(time.timestamp(), 0)).unwrap();
    }

    fn key(year: i32, month: u32) -> GroupKey {
        GroupKey::Month { year, month }
    }

    #[cfg(unix)]
    #[test]
    fn test_mixed_directory_scenario() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        let root = src.path();

        fs::write(root.join("a.jpg"), fixtures::jpeg_with_date("2020:01:15 08:00:00")).unwrap();
        fs::write(root.join("b.png"), fixtures::plain_png()).unwrap();
        set_mtime(&root.join("b.png"), 2019, 6, 5);
        fs::write(root.join("c.txt"), "not an image").unwrap();
        // Any read of d.jpg fails
        std::os::unix::fs::symlink(root.join("vanished.jpg"), root.join("d.jpg")).unwrap();

        let config = Config::new(root, dst.path().join("sorted"));
        let summary = Processor::new(config).unwrap().run().unwrap();

        let group = |k: GroupKey| {
            summary
                .groups
                .iter()
                .find(|(key, _)| *key == k)
                .map(|(_, paths)| paths.clone())
                .unwrap_or_default()
        };

        assert_eq!(group(key(2020, 1)), vec![root.join("a.jpg")]);
        assert_eq!(group(key(2019, 6)), vec![root.join("b.png")]);
        assert_eq!(summary.failed(FailureBucket::UnknownFormat), &[root.join("c.txt")]);
        assert_eq!(summary.failed(FailureBucket::Unreadable), &[root.join("d.jpg")]);
        assert!(summary.failed(FailureBucket::UnknownContent).is_empty());
        assert_eq!(summary.groups.len(), 5);
        assert_eq!(summary.classified_count(), 2);
        assert_eq!(summary.failed_count(), 2);

        let mut folders: Vec<String> = fs::read_dir(dst.path().join("sorted"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        folders.sort();
        assert_eq!(folders, vec!["2019_6", "2020_1"]);
        assert_eq!(
            fs::read(dst.path().join("sorted/2020_1/a.jpg")).unwrap(),
            fs::read(root.join("a.jpg")).unwrap()
        );
        assert!(summary.copy.failures.is_empty());
    }

    #[test]
    fn test_corrupted_image_is_unknown_content() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::write(src.path().join("broken.png"), fixtures::corrupt_png()).unwrap();

        let config = Config::new(src.path(), dst.path());
        let summary = Processor::new(config).unwrap().run().unwrap();

        assert_eq!(summary.classified_count(), 0);
        assert_eq!(
            summary.failed(FailureBucket::UnknownContent),
            &[src.path().join("broken.png")]
        );
        assert_eq!(summary.failed_count(), 1);
    }

    #[test]
    fn test_rerun_is_idempotent_for_folders() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::write(
            src.path().join("a.jpg"),
            fixtures::jpeg_with_date("2021:07:04 18:30:00"),
        )
        .unwrap();

        let config = Config::new(src.path(), dst.path());
        let processor = Processor::new(config).unwrap();
        let first = processor.run().unwrap();
        let second = processor.run().unwrap();

        assert_eq!(first.copy.copied.len(), 1);
        assert_eq!(second.copy.copied.len(), 0);
        assert_eq!(second.copy.failures.len(), 1);
        assert!(dst.path().join("2021_7/a.jpg").is_file());
    }

    #[test]
    fn test_single_thread_pool() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::create_dir_all(src.path().join("nested")).unwrap();
        fs::write(
            src.path().join("nested/a.jpg"),
            fixtures::jpeg_with_date("2018:02:28 07:00:00"),
        )
        .unwrap();

        let mut config = Config::new(src.path(), dst.path());
        config.threads = 1;
        let summary = Processor::new(config).unwrap().run().unwrap();

        assert_eq!(summary.directories_scanned, 2);
        assert!(dst.path().join("2018_2/a.jpg").is_file());
    }

    #[test]
    fn test_cancelled_run_copies_nothing() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::write(src.path().join("a.jpg"), fixtures::plain_jpeg()).unwrap();

        let processor = Processor::new(Config::new(src.path(), dst.path().join("out"))).unwrap();
        processor.cancel_token().cancel();
        let summary = processor.run().unwrap();

        assert!(summary.cancelled);
        assert!(!dst.path().join("out").exists());
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let dst = tempdir().unwrap();
        let config = Config::new(dst.path().join("missing"), dst.path().join("out"));
        let err = Processor::new(config).unwrap().run().unwrap_err();
        assert!(matches!(err, Error::SourceNotReadable { .. }));
    }
}
