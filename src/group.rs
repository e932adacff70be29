//! Shared grouping of file paths by key

use crate::classify::{FailureBucket, GroupKey};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Thread-safe map from group key to the paths filed under it
///
/// Starts with an empty list for each failure bucket. Key creation and
/// append happen under the same lock, so concurrent appends are never lost.
#[derive(Debug)]
pub struct Grouper {
    groups: Mutex<HashMap<GroupKey, Vec<PathBuf>>>,
}

impl Default for Grouper {
    fn default() -> Self {
        Self::new()
    }
}

impl Grouper {
    pub fn new() -> Self {
        let groups = FailureBucket::ALL
            .into_iter()
            .map(|bucket| (GroupKey::Failure(bucket), Vec::new()))
            .collect();
        Self {
            groups: Mutex::new(groups),
        }
    }

    /// Append `path` under `key`, creating the key's list on first use
    pub fn insert(&self, key: GroupKey, path: PathBuf) {
        let mut groups = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        groups.entry(key).or_default().push(path);
    }

    /// Copy of the paths under `key`
    pub fn paths(&self, key: &GroupKey) -> Vec<PathBuf> {
        let groups = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        groups.get(key).cloned().unwrap_or_default()
    }

    /// Number of paths in all groups, failure buckets included
    pub fn total(&self) -> usize {
        let groups = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        groups.values().map(Vec::len).sum()
    }

    /// Whether `path` is filed under any key
    pub fn contains(&self, path: &Path) -> bool {
        let groups = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        groups.values().any(|paths| paths.iter().any(|p| p == path))
    }

    /// Copy of every group, keys in sorted order
    pub fn snapshot(&self) -> Vec<(GroupKey, Vec<PathBuf>)> {
        let groups = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        let mut groups: Vec<_> = groups
            .iter()
            .map(|(key, paths)| (*key, paths.clone()))
            .collect();
        groups.sort_by_key(|(key, _)| *key);
        groups
    }
}
