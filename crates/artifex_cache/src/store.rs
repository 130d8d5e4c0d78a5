//! Per-file content fingerprints with a modification-time fast path.
//!
//! A file is only re-read and re-hashed when its on-disk modification time
//! differs from the one last observed. When the hash still matches, the
//! recorded fingerprint (and with it the time the content last changed) is
//! kept, so touching a file without editing it never makes it look newer.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use artifex_common::{Fingerprint, ModTime};
use serde::{Deserialize, Serialize};

/// Persisted state for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Content hash and the modification time at which that content was seen.
    pub fingerprint: Fingerprint,
    /// Most recent on-disk modification time observed for the file.
    pub observed: ModTime,
}

/// Outcome of validating a file against its recorded fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Modification time and content as recorded.
    Unchanged,
    /// Modification time moved but the content hash still matches.
    Touched,
    /// Content differs from the recorded fingerprint.
    Changed,
    /// No fingerprint was recorded before; one has been created.
    New,
    /// The file does not exist or cannot be read.
    Missing,
}

impl Freshness {
    /// Returns `true` if the content is known to differ from the last build.
    pub fn is_stale(self) -> bool {
        matches!(self, Freshness::Changed | Freshness::Missing)
    }
}

/// Mapping from file path to its recorded fingerprint.
///
/// Validation results are memoized for the lifetime of the store, so every
/// question about one file within a build gets the same answer.
#[derive(Debug, Default)]
pub struct FingerprintStore {
    records: BTreeMap<PathBuf, FileRecord>,
    checked: HashMap<PathBuf, Freshness>,
    modified: bool,
}

impl FingerprintStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from previously persisted records.
    pub fn from_records(records: BTreeMap<PathBuf, FileRecord>) -> Self {
        Self {
            records,
            checked: HashMap::new(),
            modified: false,
        }
    }

    /// All persisted records.
    pub fn records(&self) -> &BTreeMap<PathBuf, FileRecord> {
        &self.records
    }

    /// The recorded fingerprint of `path`, if any.
    pub fn get(&self, path: &Path) -> Option<&Fingerprint> {
        self.records.get(path).map(|r| &r.fingerprint)
    }

    /// Number of fingerprinted files.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no file is fingerprinted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The validation result for `path` if it was already checked.
    pub fn checked(&self, path: &Path) -> Option<Freshness> {
        self.checked.get(path).copied()
    }

    /// Returns `true` if any record was added, changed or removed.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Validates `path` against its recorded fingerprint.
    ///
    /// Reads the file only when its modification time differs from the one
    /// last observed. Missing files lose their record.
    pub fn check(&mut self, path: &Path) -> Freshness {
        if let Some(freshness) = self.checked(path) {
            return freshness;
        }
        let Some(mtime) = ModTime::try_of(path) else {
            return self.mark_missing(path);
        };
        if self.records.get(path).is_some_and(|r| r.observed == mtime) {
            return self.memo(path, Freshness::Unchanged);
        }
        match std::fs::read(path) {
            Ok(content) => self.observe(path, mtime, &content),
            Err(_) => self.mark_missing(path),
        }
    }

    /// Validates `path` using content the caller has just read.
    ///
    /// Compares the hash even if the modification time did not move, since
    /// the bytes are already at hand.
    pub fn observe(&mut self, path: &Path, mtime: ModTime, content: &[u8]) -> Freshness {
        if let Some(freshness) = self.checked(path) {
            return freshness;
        }
        let current = Fingerprint::of_bytes(mtime, content);
        let freshness = match self.records.get_mut(path) {
            None => {
                self.records.insert(
                    path.to_path_buf(),
                    FileRecord {
                        fingerprint: current,
                        observed: mtime,
                    },
                );
                self.modified = true;
                Freshness::New
            }
            Some(record) if record.fingerprint.hash == current.hash => {
                if record.observed == mtime {
                    Freshness::Unchanged
                } else {
                    record.observed = mtime;
                    self.modified = true;
                    Freshness::Touched
                }
            }
            Some(record) => {
                record.fingerprint = current;
                record.observed = mtime;
                self.modified = true;
                Freshness::Changed
            }
        };
        self.memo(path, freshness)
    }

    /// Drops the record for `path`.
    pub fn forget(&mut self, path: &Path) -> Option<FileRecord> {
        let removed = self.records.remove(path);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    /// Keeps only records for which `keep` returns `true`.
    ///
    /// Returns the number of records dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&Path) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|path, _| keep(path));
        let dropped = before - self.records.len();
        if dropped > 0 {
            self.modified = true;
        }
        dropped
    }

    /// Clears the modified flag after the records were persisted.
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    fn mark_missing(&mut self, path: &Path) -> Freshness {
        self.forget(path);
        self.memo(path, Freshness::Missing)
    }

    fn memo(&mut self, path: &Path, freshness: Freshness) -> Freshness {
        self.checked.insert(path.to_path_buf(), freshness);
        freshness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, FileTimes};
    use std::time::{Duration, SystemTime};

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_times(FileTimes::new().set_modified(time)).unwrap();
    }

    /// Returns a store that has seen `path` once, as a previous build would.
    fn recorded(path: &Path) -> FingerprintStore {
        let mut first = FingerprintStore::new();
        assert_eq!(first.check(path), Freshness::New);
        FingerprintStore::from_records(first.records().clone())
    }

    #[test]
    fn first_check_records_new() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("util.h");
        std::fs::write(&path, "int util(void);").unwrap();

        let mut store = FingerprintStore::new();
        assert_eq!(store.check(&path), Freshness::New);
        assert!(store.get(&path).is_some());
        assert!(store.is_modified());
    }

    #[test]
    fn unchanged_file_is_not_reread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("util.h");
        std::fs::write(&path, "int util(void);").unwrap();

        let mut store = recorded(&path);
        assert_eq!(store.check(&path), Freshness::Unchanged);
        assert!(!store.is_modified());
    }

    #[test]
    fn touch_without_edit_keeps_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("util.h");
        std::fs::write(&path, "int util(void);").unwrap();
        let mut store = recorded(&path);
        let before = *store.get(&path).unwrap();

        set_mtime(&path, SystemTime::now() + Duration::from_secs(60));

        assert_eq!(store.check(&path), Freshness::Touched);
        assert_eq!(*store.get(&path).unwrap(), before);
        assert_eq!(
            store.records()[&path].observed,
            ModTime::of(&path).unwrap()
        );
    }

    #[test]
    fn edited_file_is_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("util.h");
        std::fs::write(&path, "int util(void);").unwrap();
        let mut store = recorded(&path);

        std::fs::write(&path, "long util(void);").unwrap();
        set_mtime(&path, SystemTime::now() + Duration::from_secs(60));

        assert_eq!(store.check(&path), Freshness::Changed);
        assert_eq!(store.get(&path).unwrap().mtime, ModTime::of(&path).unwrap());
    }

    #[test]
    fn observe_detects_edit_with_same_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("util.h");
        std::fs::write(&path, "a").unwrap();
        let mut store = recorded(&path);
        let mtime = store.records()[&path].observed;

        assert_eq!(store.observe(&path, mtime, b"b"), Freshness::Changed);
    }

    #[test]
    fn missing_file_drops_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.h");
        std::fs::write(&path, "x").unwrap();
        let mut store = recorded(&path);

        std::fs::remove_file(&path).unwrap();
        assert_eq!(store.check(&path), Freshness::Missing);
        assert!(store.get(&path).is_none());
        assert!(store.is_modified());
    }

    #[test]
    fn results_are_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.h");
        std::fs::write(&path, "x").unwrap();

        let mut store = FingerprintStore::new();
        assert_eq!(store.check(&path), Freshness::New);
        std::fs::write(&path, "changed").unwrap();
        assert_eq!(store.check(&path), Freshness::New);
        assert_eq!(store.checked(&path), Some(Freshness::New));
    }

    #[test]
    fn retain_prunes_unreferenced() {
        let mut store = FingerprintStore::new();
        let keep = PathBuf::from("keep.h");
        let drop = PathBuf::from("drop.h");
        store.observe(&keep, ModTime::new(1, 0), b"k");
        store.observe(&drop, ModTime::new(1, 0), b"d");

        let mut store = FingerprintStore::from_records(store.records().clone());
        assert_eq!(store.retain(|p| p == keep.as_path()), 1);
        assert_eq!(store.len(), 1);
        assert!(store.is_modified());
    }

    #[test]
    fn stale_classification() {
        assert!(Freshness::Changed.is_stale());
        assert!(Freshness::Missing.is_stale());
        assert!(!Freshness::Touched.is_stale());
        assert!(!Freshness::New.is_stale());
        assert!(!Freshness::Unchanged.is_stale());
    }
}
