//! CLI argument parsing with clap

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Photo Month Sorter - copy photos into year_month folders
///
/// Reads the capture date of every image below the source directory
/// (EXIF DateTime, falling back to file timestamps) and copies each image
/// into a "{year}_{month}" folder under the destination directory.
#[derive(Parser, Debug, Default)]
#[command(name = "photo-month-sorter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Directory tree to scan for images
    #[arg(short, long, env = "PHOTO_SORTER_SOURCE")]
    pub source: Option<PathBuf>,

    /// Directory receiving the year_month folders
    #[arg(short, long, env = "PHOTO_SORTER_DESTINATION")]
    pub destination: Option<PathBuf>,

    /// Number of threads for parallel processing (0 = auto)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Descend into symlinked directories
    #[arg(short = 'L', long)]
    pub follow_links: bool,

    /// Replace files that already exist in the destination
    #[arg(long)]
    pub overwrite: bool,

    /// Do not carry the source modification time over to copies
    #[arg(long)]
    pub no_preserve_mtime: bool,

    /// Dry run mode - show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Log file path
    #[arg(short, long)]
    pub log_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub sample_config: bool,
}

impl Cli {
    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref source) = self.source {
            config.source_dir = source.clone();
        }
        if let Some(ref destination) = self.destination {
            config.destination_dir = destination.clone();
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.follow_links {
            config.follow_links = true;
        }
        if self.overwrite {
            config.overwrite = true;
        }
        if self.no_preserve_mtime {
            config.preserve_mtime = false;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if let Some(ref log_file) = self.log_file {
            config.log_file = log_file.clone();
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }

    /// Whether the required paths were given on the command line
    pub fn has_paths(&self) -> bool {
        self.source.is_some() && self.destination.is_some()
    }
}
