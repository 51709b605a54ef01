//! Session snapshot of the `quality` table.
//!
//! A dashboard session loads the table once and derives every view from
//! that copy. The copy is never reloaded behind the caller's back: callers
//! can ask whether the file on disk has changed (`is_stale`) and decide to
//! `refresh` or `invalidate`.

use crate::model::{Measurement, StoreError};
use crate::store;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct Snapshot {
    rows: Vec<Measurement>,
    loaded_at: DateTime<Utc>,
    /// Modification time of the database file when it was read.
    source_modified: Option<SystemTime>,
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl Snapshot {
    /// Wrap rows that did not come from a file (tests, fixtures).
    pub fn from_rows(rows: Vec<Measurement>) -> Self {
        Self { rows, loaded_at: Utc::now(), source_modified: None }
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        // Read the mtime first so a replace racing with the read shows up
        // as stale afterwards.
        let source_modified = modified_time(path);
        let rows = store::load_all(path)?;
        log::debug!(
            target: crate::logging::PRESENTER,
            "Loaded {} rows from {}",
            rows.len(),
            path.display()
        );
        Ok(Self { rows, loaded_at: Utc::now(), source_modified })
    }

    pub fn rows(&self) -> &[Measurement] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Owns the snapshot for one session.
pub struct SnapshotCache {
    path: PathBuf,
    current: Option<Snapshot>,
}

impl SnapshotCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), current: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The session snapshot, loading it on first use.
    pub fn get(&mut self) -> Result<&Snapshot, StoreError> {
        let snapshot = match self.current.take() {
            Some(s) => s,
            None => Snapshot::load(&self.path)?,
        };
        Ok(self.current.insert(snapshot))
    }

    /// Drop the cached copy; the next `get` reads the file again.
    pub fn invalidate(&mut self) {
        self.current = None;
    }

    pub fn refresh(&mut self) -> Result<&Snapshot, StoreError> {
        self.invalidate();
        self.get()
    }

    /// True when a snapshot is held and the file has since been replaced
    /// (or removed).
    pub fn is_stale(&self) -> bool {
        match &self.current {
            Some(snapshot) => match snapshot.source_modified {
                Some(seen) => modified_time(&self.path) != Some(seen),
                None => false,
            },
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn measurement(location: &str, value: f64) -> Measurement {
        Measurement {
            location: location.to_string(),
            parameter: "pm25".to_string(),
            value,
            unit: "µg/m³".to_string(),
            latitude: None,
            longitude: None,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_get_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("air.db");
        store::replace_all(&path, &[measurement("A", 10.0)]).unwrap();

        let mut cache = SnapshotCache::new(&path);
        assert_eq!(cache.get().unwrap().len(), 1);

        store::replace_all(&path, &[measurement("A", 10.0), measurement("B", 20.0)]).unwrap();
        // Still the session's copy until refreshed.
        assert_eq!(cache.get().unwrap().len(), 1);
        assert_eq!(cache.refresh().unwrap().len(), 2);
    }

    #[test]
    fn test_stale_after_replace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("air.db");
        store::replace_all(&path, &[measurement("A", 10.0)]).unwrap();
        set_mtime(&path, 1_700_000_000);

        let mut cache = SnapshotCache::new(&path);
        assert!(!cache.is_stale());
        cache.get().unwrap();
        assert!(!cache.is_stale());

        store::replace_all(&path, &[measurement("B", 20.0)]).unwrap();
        set_mtime(&path, 1_700_000_100);
        assert!(cache.is_stale());

        cache.refresh().unwrap();
        assert!(!cache.is_stale());
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("air.db");
        store::replace_all(&path, &[measurement("A", 10.0)]).unwrap();

        let mut cache = SnapshotCache::new(&path);
        cache.get().unwrap();
        store::replace_all(&path, &[]).unwrap();
        cache.invalidate();
        assert!(cache.get().unwrap().is_empty());
    }

    #[test]
    fn test_missing_store_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = SnapshotCache::new(dir.path().join("air.db"));
        assert!(matches!(cache.get(), Err(StoreError::NotFound(_))));
    }
}
