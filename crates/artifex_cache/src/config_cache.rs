//! Configuration cache: resolved settings and memoized package queries.
//!
//! Stored as JSON next to the dependency cache. Package flags are queried
//! once per package name and reused by later builds; the recorded settings
//! let the pipeline notice when the compile or link command line changed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::ARTIFEX_VERSION;

/// Flags reported by the package metadata tool for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFlags {
    /// Extra compile flags.
    pub cflags: Vec<String>,
    /// Extra link flags.
    pub libs: Vec<String>,
}

/// The parts of a target's configuration that end up on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSettings {
    /// Compiler driver program.
    pub compiler: String,
    /// Flattened compile flags.
    pub cflags: Vec<String>,
    /// Include search roots.
    pub include_dirs: Vec<PathBuf>,
    /// Link flags from the target's library list.
    pub lib_flags: Vec<String>,
    /// Packages whose flags are part of the command line.
    pub packages: Vec<String>,
}

/// Persisted configuration state for one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCache {
    /// artifex version that wrote this cache.
    pub artifex_version: String,
    /// Settings used by the last successful build.
    pub settings: Option<ResolvedSettings>,
    /// Memoized package queries, keyed by package name.
    pub packages: BTreeMap<String, PackageFlags>,
    #[serde(skip)]
    dirty: bool,
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigCache {
    /// Creates an empty configuration cache.
    pub fn new() -> Self {
        Self {
            artifex_version: ARTIFEX_VERSION.to_string(),
            settings: None,
            packages: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Loads the cache at `path`, returning `None` if it is missing,
    /// unparsable, or written by another artifex version.
    pub fn load(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let cache: Self = serde_json::from_str(&content).ok()?;
        cache.is_compatible().then_some(cache)
    }

    /// Loads the cache at `path` or starts an empty one.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Writes the cache as pretty-printed JSON if anything was recorded since
    /// it was loaded, or if `path` does not exist yet. Returns whether it
    /// wrote.
    pub fn save(&mut self, path: &Path) -> Result<bool, CacheError> {
        if !self.dirty && path.is_file() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.dirty = false;
        Ok(true)
    }

    /// Returns `true` if this cache was written by the running artifex version.
    pub fn is_compatible(&self) -> bool {
        self.artifex_version == ARTIFEX_VERSION
    }

    /// The memoized flags for `package`.
    pub fn package(&self, package: &str) -> Option<&PackageFlags> {
        self.packages.get(package)
    }

    /// Memoizes the flags for `package`.
    pub fn record_package(&mut self, package: &str, flags: PackageFlags) {
        if self.packages.get(package) != Some(&flags) {
            self.packages.insert(package.to_string(), flags);
            self.dirty = true;
        }
    }

    /// Records the settings of a successful build.
    pub fn set_settings(&mut self, settings: ResolvedSettings) {
        if self.settings.as_ref() != Some(&settings) {
            self.settings = Some(settings);
            self.dirty = true;
        }
    }

    /// Returns `true` if settings were recorded and differ from `current`.
    ///
    /// A cache without settings (first build) never reports a change.
    pub fn settings_changed(&self, current: &ResolvedSettings) -> bool {
        self.settings.as_ref().is_some_and(|s| s != current)
    }
}
