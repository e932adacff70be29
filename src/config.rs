//! Configuration types for the photo month sorter

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default log file name, written to the working directory
pub const DEFAULT_LOG_FILE: &str = "processingLog.txt";

/// Configuration for the photo month sorter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory tree to scan for images
    pub source_dir: PathBuf,

    /// Directory that receives one `{year}_{month}` folder per group
    pub destination_dir: PathBuf,

    /// Number of threads for parallel processing (0 = auto)
    #[serde(default)]
    pub threads: usize,

    /// Descend into symlinked directories (each directory is visited once)
    #[serde(default)]
    pub follow_links: bool,

    /// Replace files that already exist in the destination
    #[serde(default)]
    pub overwrite: bool,

    /// Dry run mode - classify and report without copying
    #[serde(default)]
    pub dry_run: bool,

    /// Carry the source modification time over to the copy
    #[serde(default = "default_true")]
    pub preserve_mtime: bool,

    /// Verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Log file path
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            destination_dir: PathBuf::from("organized"),
            threads: 0, // Auto-detect
            follow_links: false,
            overwrite: false,
            dry_run: false,
            preserve_mtime: true,
            verbose: false,
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// Create a configuration for the given source and destination with defaults elsewhere
    pub fn new(source_dir: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            destination_dir: destination_dir.into(),
            ..Self::default()
        }
    }

    /// Reject configurations that would make the run feed on its own output
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("source directory is empty".into()));
        }
        if self.destination_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("destination directory is empty".into()));
        }

        let source = fs::canonicalize(&self.source_dir).unwrap_or_else(|_| self.source_dir.clone());
        let destination = canonicalize_lenient(&self.destination_dir);

        if destination.starts_with(&source) {
            return Err(ConfigError::Invalid(format!(
                "destination '{}' is inside source '{}'",
                self.destination_dir.display(),
                self.source_dir.display()
            )));
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError { source: e })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Photo Month Sorter Configuration File
# This file uses TOML format (https://toml.io)

# Directory tree to scan for images
source_dir = "D:/Photos"

# Output directory; one "{year}_{month}" folder is created per group, e.g. "2021_7"
destination_dir = "D:/Sorted"

# Number of threads for parallel processing (0 = auto-detect)
threads = 0

# Descend into symlinked directories
follow_links = false

# Replace files that already exist in the destination
# - false: an existing file is reported as a failed copy (default)
# - true: the existing file is overwritten
overwrite = false

# Dry run mode - classify and report without copying
dry_run = false

# Keep the source modification time on copied files
preserve_mtime = true

# Verbose output - show debug messages on the console
verbose = false

# Log file (debug level and above)
log_file = "processingLog.txt"
"#
        .to_string()
    }
}

/// Canonicalize the longest existing ancestor and re-append the rest
fn canonicalize_lenient(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut tail = Vec::new();

    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                tail.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }

    let mut resolved = fs::canonicalize(&existing).unwrap_or(existing);
    for name in tail.into_iter().rev() {
        resolved.push(name);
    }
    resolved
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError { source: toml::ser::Error },
    /// Configuration values are inconsistent
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
            ConfigError::Invalid(message) => write!(f, "Invalid configuration: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(&Config::sample_config()).unwrap();
        assert_eq!(config.source_dir, PathBuf::from("D:/Photos"));
        assert_eq!(config.destination_dir, PathBuf::from("D:/Sorted"));
        assert!(!config.overwrite);
        assert!(config.preserve_mtime);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config =
            toml::from_str("source_dir = \"in\"\ndestination_dir = \"out\"\n").unwrap();
        assert_eq!(config.threads, 0);
        assert!(!config.follow_links);
        assert!(config.preserve_mtime);
        assert_eq!(config.log_file, PathBuf::from(DEFAULT_LOG_FILE));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("sorter.toml");

        let mut config = Config::new("photos", "sorted");
        config.threads = 4;
        config.overwrite = true;
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.source_dir, PathBuf::from("photos"));
        assert_eq!(loaded.threads, 4);
        assert!(loaded.overwrite);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = Config::load_from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_validate_rejects_destination_inside_source() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path(), dir.path().join("sorted"));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let sibling = tempdir().unwrap();
        let config = Config::new(dir.path(), sibling.path().join("sorted"));
        assert!(config.validate().is_ok());
    }
}
