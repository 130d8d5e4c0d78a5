//! The per-target dependency and fingerprint cache.
//!
//! Holds three maps: source file to its transitive include closure, file to
//! content fingerprint, and object file to the fingerprint it had right after
//! the compile that produced it. The cache is only written back when one of
//! them changed during the run.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use artifex_common::Fingerprint;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::format;
use crate::store::{FileRecord, FingerprintStore};

/// The transitive set of files a source depends on, including itself.
pub type DependencySet = BTreeSet<PathBuf>;

/// On-disk payload of a [`BuildCache`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheData {
    dependencies: BTreeMap<PathBuf, DependencySet>,
    files: BTreeMap<PathBuf, FileRecord>,
    objects: BTreeMap<PathBuf, Fingerprint>,
}

/// Dependency records, file fingerprints and object fingerprints for one target.
#[derive(Debug)]
pub struct BuildCache {
    path: PathBuf,
    dependencies: BTreeMap<PathBuf, DependencySet>,
    objects: BTreeMap<PathBuf, Fingerprint>,
    store: FingerprintStore,
    dirty: bool,
}

impl BuildCache {
    /// Creates an empty cache that will be saved to `path`.
    pub fn empty(path: &Path) -> Self {
        Self::from_data(path, CacheData::default())
    }

    /// Loads the cache at `path`, falling back to an empty cache.
    ///
    /// A missing, truncated, corrupt or version-mismatched file is a cache
    /// miss, never an error.
    pub fn load(path: &Path) -> Self {
        let data = match std::fs::read(path) {
            Ok(raw) => format::decode::<CacheData>(&raw).unwrap_or_else(|| {
                tracing::debug!(path = %path.display(), "discarding unreadable build cache");
                CacheData::default()
            }),
            Err(_) => CacheData::default(),
        };
        Self::from_data(path, data)
    }

    fn from_data(path: &Path, data: CacheData) -> Self {
        Self {
            path: path.to_path_buf(),
            dependencies: data.dependencies,
            objects: data.objects,
            store: FingerprintStore::from_records(data.files),
            dirty: false,
        }
    }

    /// Where this cache is saved.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The recorded dependency set of `source`.
    pub fn dependencies(&self, source: &Path) -> Option<&DependencySet> {
        self.dependencies.get(source)
    }

    /// Records the dependency set of `source`.
    pub fn set_dependencies(&mut self, source: &Path, deps: DependencySet) {
        if self.dependencies.get(source) != Some(&deps) {
            self.dependencies.insert(source.to_path_buf(), deps);
            self.dirty = true;
        }
    }

    /// Removes the dependency record of `source`.
    pub fn evict_dependencies(&mut self, source: &Path) -> Option<DependencySet> {
        let removed = self.dependencies.remove(source);
        self.dirty |= removed.is_some();
        removed
    }

    /// Number of sources with a dependency record.
    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    /// The recorded fingerprint of an object file.
    pub fn object(&self, object: &Path) -> Option<&Fingerprint> {
        self.objects.get(object)
    }

    /// Records the fingerprint of a freshly compiled object file.
    pub fn record_object(&mut self, object: &Path, fingerprint: Fingerprint) {
        if self.objects.get(object) != Some(&fingerprint) {
            self.objects.insert(object.to_path_buf(), fingerprint);
            self.dirty = true;
        }
    }

    /// Removes the fingerprint of an object file.
    pub fn evict_object(&mut self, object: &Path) -> Option<Fingerprint> {
        let removed = self.objects.remove(object);
        self.dirty |= removed.is_some();
        removed
    }

    /// Number of object fingerprints.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// The per-file fingerprint store.
    pub fn store(&self) -> &FingerprintStore {
        &self.store
    }

    /// Mutable access to the per-file fingerprint store.
    pub fn store_mut(&mut self) -> &mut FingerprintStore {
        &mut self.store
    }

    /// Returns `true` if anything changed since the cache was loaded or saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.store.is_modified()
    }

    /// Drops fingerprints of files no dependency record refers to, and object
    /// records whose source is no longer part of the target.
    ///
    /// Returns the number of entries dropped.
    pub fn prune(&mut self, live_objects: &[PathBuf]) -> usize {
        let referenced: BTreeSet<&Path> = self
            .dependencies
            .values()
            .flatten()
            .map(PathBuf::as_path)
            .collect();
        let files = self.store.retain(|p| referenced.contains(p));
        let before = self.objects.len();
        self.objects.retain(|o, _| live_objects.contains(o));
        let objects = before - self.objects.len();
        self.dirty |= objects > 0;
        files + objects
    }

    /// Writes the cache if it changed. Returns `true` if a file was written.
    ///
    /// Creates the parent directory if needed.
    pub fn save(&mut self) -> Result<bool, CacheError> {
        if !self.is_dirty() {
            tracing::debug!(path = %self.path.display(), "build cache unchanged, not writing");
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let data = CacheData {
            dependencies: self.dependencies.clone(),
            files: self.store.records().clone(),
            objects: self.objects.clone(),
        };
        let blob = format::encode(&data)?;
        std::fs::write(&self.path, blob).map_err(|e| CacheError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        self.dirty = false;
        self.store.mark_saved();
        Ok(true)
    }

    /// Deletes the cache file at `path`, if present.
    pub fn discard(path: &Path) -> Result<(), CacheError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}
