//! Modification times and file fingerprints.
//!
//! A [`Fingerprint`] pairs the modification time at which a file's content was
//! last observed to change with the hash of that content. Comparing the
//! timestamp is cheap; the hash is only consulted when the timestamp moves.

use std::fs::Metadata;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

/// A file modification time with nanosecond resolution.
///
/// Stored as seconds and nanoseconds since the Unix epoch so it serializes
/// identically on every platform. Times before the epoch clamp to zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModTime {
    secs: u64,
    nanos: u32,
}

impl ModTime {
    /// The Unix epoch.
    pub const EPOCH: ModTime = ModTime { secs: 0, nanos: 0 };

    /// Creates a timestamp from raw seconds and nanoseconds.
    pub fn new(secs: u64, nanos: u32) -> Self {
        Self { secs, nanos }
    }

    /// Converts a [`SystemTime`].
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::new(d.as_secs(), d.subsec_nanos()),
            Err(_) => Self::EPOCH,
        }
    }

    /// Reads the modification time from file metadata.
    pub fn from_metadata(meta: &Metadata) -> std::io::Result<Self> {
        meta.modified().map(Self::from_system_time)
    }

    /// Reads the modification time of the file at `path`.
    pub fn of(path: &Path) -> std::io::Result<Self> {
        Self::from_metadata(&std::fs::metadata(path)?)
    }

    /// Returns the modification time of `path`, or `None` if it cannot be read.
    pub fn try_of(path: &Path) -> Option<Self> {
        Self::of(path).ok()
    }
}

/// A cheap staleness witness for one file: modification time plus content hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Modification time recorded when the content was hashed.
    pub mtime: ModTime,
    /// Hash of the file content.
    pub hash: ContentHash,
}

impl Fingerprint {
    /// Creates a fingerprint from already-known parts.
    pub fn new(mtime: ModTime, hash: ContentHash) -> Self {
        Self { mtime, hash }
    }

    /// Fingerprints content that was just read from a file with the given mtime.
    pub fn of_bytes(mtime: ModTime, content: &[u8]) -> Self {
        Self::new(mtime, ContentHash::from_bytes(content))
    }

    /// Stats and reads `path` and fingerprints it.
    pub fn of_file(path: &Path) -> std::io::Result<Self> {
        let mtime = ModTime::of(path)?;
        let content = std::fs::read(path)?;
        Ok(Self::of_bytes(mtime, &content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn ordering_uses_nanos() {
        let a = ModTime::new(10, 5);
        let b = ModTime::new(10, 6);
        let c = ModTime::new(11, 0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn pre_epoch_clamps() {
        let before = UNIX_EPOCH - Duration::from_secs(5);
        assert_eq!(ModTime::from_system_time(before), ModTime::EPOCH);
    }

    #[test]
    fn from_system_time_keeps_subsec() {
        let t = UNIX_EPOCH + Duration::new(42, 123);
        assert_eq!(ModTime::from_system_time(t), ModTime::new(42, 123));
    }

    #[test]
    fn of_file_hashes_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.c");
        std::fs::write(&path, "int a;").unwrap();
        let fp = Fingerprint::of_file(&path).unwrap();
        assert_eq!(fp.hash, ContentHash::from_bytes(b"int a;"));
        assert_eq!(fp.mtime, ModTime::of(&path).unwrap());
    }

    #[test]
    fn missing_file_has_no_mtime() {
        assert!(ModTime::try_of(Path::new("/nonexistent/artifex/x.c")).is_none());
    }
}
