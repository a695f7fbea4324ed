//! Persistent store of canonical page snapshots, keyed by (origin, path, mode).
//!
//! Each capture is one immutable file named `{slug}-{mode}-{epochSeconds}.txt`,
//! so "most recent for this key" is a plain filename sort. The differ only
//! ever compares the newest capture for a key against the one immediately
//! before it for the *same* key; captures of differing mode are never paired.

mod differ;

pub use differ::{DiffLine, diff_lines};

use crate::mode::PageMode;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Identity of a comparable snapshot series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    /// ASCII origin, e.g. `https://example.com`.
    pub origin: String,
    /// URL path, leading slash included.
    pub path: String,
    pub mode: PageMode,
}

impl SnapshotKey {
    /// Builds a key from a page URL and the classified mode.
    pub fn from_url(url: &str, mode: PageMode) -> Result<Self> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::Snapshot(format!("Invalid page URL '{}': {}", url, e)))?;
        Ok(Self {
            origin: parsed.origin().ascii_serialization(),
            path: parsed.path().to_string(),
            mode,
        })
    }

    /// Filename prefix shared by every capture of this key.
    pub fn file_prefix(&self) -> String {
        format!("{}-{}", slugify(&self.origin, &self.path), self.mode.as_str())
    }
}

/// Lowercases origin+path and collapses runs of non-alphanumerics to `-`.
fn slugify(origin: &str, path: &str) -> String {
    let mut slug = String::new();
    for ch in origin.chars().chain(path.chars()) {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Result of diffing the newest capture for a key against its predecessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffReport {
    /// No prior capture for this key; the full content is the baseline.
    Initial(String),
    /// Line-level changes since the previous capture for the same key.
    Changes(Vec<DiffLine>),
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        match self {
            DiffReport::Initial(content) => content.is_empty(),
            DiffReport::Changes(changes) => changes.is_empty(),
        }
    }

    pub fn render(&self) -> String {
        match self {
            DiffReport::Initial(content) => content.clone(),
            DiffReport::Changes(changes) => changes
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Filesystem-backed snapshot store.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Opens (and creates if missing) a store rooted at `dir`.
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Default shared scratch location, `~/.osprey/snapshots`.
    pub fn default_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Snapshot("Could not determine home directory".to_string()))?;
        Ok(home.join(".osprey").join("snapshots"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a new immutable capture for `key` and returns its path.
    pub fn record(&self, key: &SnapshotKey, content: &str) -> Result<PathBuf> {
        let mut stamp = chrono::Utc::now().timestamp();
        // Two captures in the same second would collide; bump so filename
        // order stays the capture order.
        while self.capture_path(key, stamp).exists() {
            stamp += 1;
        }

        let path = self.capture_path(key, stamp);
        std::fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), "snapshot recorded");
        Ok(path)
    }

    /// Diffs the newest capture for `key` against the one before it.
    ///
    /// With a single capture this falls back to the full content; it never
    /// errors for lack of history.
    pub fn diff(&self, key: &SnapshotKey) -> Result<DiffReport> {
        let captures = self.captures(key)?;
        let mut newest_first = captures.into_iter().rev();

        let Some(newest) = newest_first.next() else {
            return Ok(DiffReport::Initial(String::new()));
        };
        let new_content = std::fs::read_to_string(&newest)?;

        match newest_first.next() {
            None => Ok(DiffReport::Initial(new_content)),
            Some(previous) => {
                let old_content = std::fs::read_to_string(&previous)?;
                Ok(DiffReport::Changes(diff_lines(&old_content, &new_content)))
            }
        }
    }

    /// Content of the newest capture for `key`, if any.
    pub fn latest(&self, key: &SnapshotKey) -> Result<Option<String>> {
        match self.captures(key)?.last() {
            Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
            None => Ok(None),
        }
    }

    fn capture_path(&self, key: &SnapshotKey, stamp: i64) -> PathBuf {
        self.dir
            .join(format!("{}-{}.txt", key.file_prefix(), stamp))
    }

    /// All capture paths for `key`, oldest first.
    fn captures(&self, key: &SnapshotKey) -> Result<Vec<PathBuf>> {
        let prefix = format!("{}-", key.file_prefix());
        let mut stamped = Vec::new();

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(rest) = name.strip_prefix(&prefix) else {
                continue;
            };
            let Some(stamp) = rest.strip_suffix(".txt") else {
                continue;
            };
            // The key slug never ends in a digit run that parses as a full
            // suffix, so anything non-numeric here is a different key.
            if let Ok(stamp) = stamp.parse::<i64>() {
                stamped.push((stamp, entry.path()));
            }
        }

        stamped.sort_by_key(|(stamp, _)| *stamp);
        Ok(stamped.into_iter().map(|(_, path)| path).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SnapshotStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    fn key(mode: PageMode) -> SnapshotKey {
        SnapshotKey::from_url("https://example.com/cart", mode).unwrap()
    }

    #[test]
    fn test_key_from_url() {
        let key = SnapshotKey::from_url("https://example.com/a/b?q=1", PageMode::Base).unwrap();

        assert_eq!(key.origin, "https://example.com");
        assert_eq!(key.path, "/a/b");
        assert_eq!(key.file_prefix(), "https-example-com-a-b-base");
    }

    #[test]
    fn test_first_diff_falls_back_to_full_content() {
        let (_dir, store) = store();
        let key = key(PageMode::Base);

        store.record(&key, "heading Cart\nbutton Checkout").unwrap();

        let report = store.diff(&key).unwrap();
        assert_eq!(
            report,
            DiffReport::Initial("heading Cart\nbutton Checkout".to_string())
        );
    }

    #[test]
    fn test_capture_then_diff_with_no_change_is_empty() {
        let (_dir, store) = store();
        let key = key(PageMode::Base);

        store.record(&key, "heading Cart").unwrap();
        store.record(&key, "heading Cart").unwrap();

        let report = store.diff(&key).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_diff_reports_changes_between_latest_pair() {
        let (_dir, store) = store();
        let key = key(PageMode::Base);

        store.record(&key, "item Apple").unwrap();
        store.record(&key, "item Apple\nitem Pear").unwrap();

        let report = store.diff(&key).unwrap();
        assert_eq!(
            report,
            DiffReport::Changes(vec![DiffLine::Added("item Pear".to_string())])
        );
    }

    #[test]
    fn test_modes_never_pair() {
        let (_dir, store) = store();
        let base = key(PageMode::Base);
        let dialog = key(PageMode::Dialog);

        store.record(&base, "heading Cart\nbutton Checkout").unwrap();
        store.record(&dialog, "dialog Confirm order?").unwrap();

        // The dialog capture has no prior dialog-mode entry, so the base
        // capture must not leak in as a baseline.
        let report = store.diff(&dialog).unwrap();
        assert_eq!(
            report,
            DiffReport::Initial("dialog Confirm order?".to_string())
        );
    }

    #[test]
    fn test_same_second_captures_keep_order() {
        let (_dir, store) = store();
        let key = key(PageMode::Base);

        store.record(&key, "v1").unwrap();
        store.record(&key, "v2").unwrap();
        store.record(&key, "v3").unwrap();

        assert_eq!(store.latest(&key).unwrap().unwrap(), "v3");
    }
}
