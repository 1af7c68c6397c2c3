//! Investigation history from the result directory.
//!
//! Layout: `<root>/<name>/`, one directory per past investigation. Names
//! starting with `url_` are URL investigations; anything else is a document
//! investigation whose name is the sanitized document label. The directory's
//! modification time is the record timestamp.
//!
//! The store only reads. Tools create result directories; nothing here
//! deletes or rewrites them, and every listing re-scans the root.

use crate::types::{InvestigationRecord, TargetKind};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Directory name prefix of URL investigations
pub const URL_PREFIX: &str = "url_";

/// Label shown for every URL investigation
pub const URL_LABEL: &str = "URL Investigation";

/// Word separator used in document directory names
const NAME_SEPARATOR: char = '_';

/// Read-only view over a result root
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List every past investigation under the root.
    ///
    /// A missing or unreadable root means "no investigations yet" and yields
    /// an empty list. Entries whose metadata cannot be read are skipped.
    /// Records come back in directory enumeration order.
    pub fn list_investigations(&self) -> Vec<InvestigationRecord> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(root = %self.root.display(), error = %e, "Result root not readable");
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(root = %self.root.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            let path = entry.path();
            let Some(dir_name) = entry.file_name().to_str().map(str::to_string) else {
                debug!(path = %path.display(), "Skipping non UTF-8 directory name");
                continue;
            };

            // Follows symlinks, so a dangling link fails here and is skipped
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping entry without metadata");
                    continue;
                }
            };
            if !metadata.is_dir() {
                continue;
            }

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping entry without mtime");
                    continue;
                }
            };

            records.push(record_for(dir_name, modified));
        }

        debug!(root = %self.root.display(), count = records.len(), "Listed investigations");
        records
    }

    /// Find the directory of a record by its stored directory name.
    ///
    /// Returns `None` if the directory is gone or the name does not denote a
    /// direct child of the root.
    pub fn locate(&self, record: &InvestigationRecord) -> Option<PathBuf> {
        self.locate_dir(&record.dir_name)
    }

    /// Same as [`locate`](Self::locate), by directory name.
    pub fn locate_dir(&self, dir_name: &str) -> Option<PathBuf> {
        let mut components = Path::new(dir_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return None,
        }

        let path = self.root.join(dir_name);
        path.is_dir().then_some(path)
    }

    /// Map a display label back to a directory, the lossy way.
    ///
    /// Spaces in `label` become `_` and the first directory whose name
    /// contains the result wins. Two directories sharing a normalized label
    /// cannot be told apart; prefer [`locate`](Self::locate).
    pub fn resolve_record_location(&self, label: &str) -> Option<PathBuf> {
        let needle = label.replace(' ', &NAME_SEPARATOR.to_string());

        let entries = fs::read_dir(&self.root).ok()?;
        entries
            .filter_map(|entry| entry.ok())
            .find(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.contains(&needle))
                    && entry.path().is_dir()
            })
            .map(|entry| entry.path())
    }
}

/// Classify a result directory by its name.
pub fn classify(dir_name: &str) -> (TargetKind, String) {
    if dir_name.starts_with(URL_PREFIX) {
        (TargetKind::Url, URL_LABEL.to_string())
    } else {
        (TargetKind::Document, dir_name.replace(NAME_SEPARATOR, " "))
    }
}

fn record_for(dir_name: String, modified: SystemTime) -> InvestigationRecord {
    let (kind, label) = classify(&dir_name);
    InvestigationRecord {
        timestamp: DateTime::<Local>::from(modified),
        kind,
        label,
        dir_name,
    }
}

/// Order records for display, most recent first.
pub fn sort_newest_first(records: &mut [InvestigationRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
