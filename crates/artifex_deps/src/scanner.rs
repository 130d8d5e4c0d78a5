//! Transitive quoted-include scanning.
//!
//! Only `#include "name"` directives are followed. Angle-bracket includes are
//! system headers and never tracked. Includes that cannot be resolved or read
//! are dropped from the dependency set with a debug message.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use artifex_cache::{DependencySet, FingerprintStore};
use artifex_common::{normalize, ModTime};
use regex::Regex;

use crate::error::ScanError;
use crate::resolver::{PathResolver, ScanScope};

static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*#\s*include\s*"([^"]+)""#).expect("include pattern is valid")
});

/// Returns the quoted include names in `content`, in order of appearance.
pub fn include_names(content: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(content)
        .lines()
        .filter_map(|line| INCLUDE_RE.captures(line))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Result of scanning one file.
struct Scanned {
    deps: DependencySet,
    /// Files still being scanned further up the stack that this closure
    /// stopped at. A closure that stopped at an open file is incomplete for
    /// anyone but that file and must not be memoized.
    open: BTreeSet<PathBuf>,
}

/// Computes transitive dependency sets for source files.
///
/// Closures are memoized for the lifetime of the scanner, so a header
/// shared by many sources is read once per build.
#[derive(Debug)]
pub struct IncludeScanner {
    resolver: PathResolver,
    closures: HashMap<PathBuf, DependencySet>,
}

impl IncludeScanner {
    /// Creates a scanner using `resolver` to locate includes.
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            closures: HashMap::new(),
        }
    }

    /// The resolver used to locate includes.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Returns the set of files `source` depends on, including itself.
    ///
    /// Every file read is fingerprinted into `store` from the bytes already
    /// in hand. An unreadable `source` yields a set holding only itself.
    pub fn scan(&mut self, source: &Path, store: &mut FingerprintStore) -> DependencySet {
        let source = normalize(source);
        let mut in_progress = HashSet::new();
        match self.scan_file(&source, None, store, &mut in_progress) {
            Ok(scanned) => scanned.deps,
            Err(err) => {
                tracing::debug!("{err}");
                DependencySet::from([source])
            }
        }
    }

    fn scan_file(
        &mut self,
        path: &Path,
        scope: Option<&ScanScope<'_>>,
        store: &mut FingerprintStore,
        in_progress: &mut HashSet<PathBuf>,
    ) -> Result<Scanned, ScanError> {
        if let Some(deps) = self.closures.get(path) {
            return Ok(Scanned {
                deps: deps.clone(),
                open: BTreeSet::new(),
            });
        }
        if in_progress.contains(path) {
            return Ok(Scanned {
                deps: DependencySet::from([path.to_path_buf()]),
                open: BTreeSet::from([path.to_path_buf()]),
            });
        }

        let read_err = |source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mtime = ModTime::of(path).map_err(read_err)?;
        let content = std::fs::read(path).map_err(read_err)?;
        store.observe(path, mtime, &content);

        in_progress.insert(path.to_path_buf());
        let dir = path.parent().unwrap_or(Path::new("."));
        let frame = match scope {
            Some(outer) => outer.enter(dir),
            None => ScanScope::new(dir),
        };

        let mut scanned = Scanned {
            deps: DependencySet::from([path.to_path_buf()]),
            open: BTreeSet::new(),
        };
        for name in include_names(&content) {
            let resolved = match self.resolver.locate(&name, Some(&frame)) {
                Ok(resolved) => resolved,
                Err(err) => {
                    tracing::debug!("{}: {err}, skipping", path.display());
                    continue;
                }
            };
            match self.scan_file(&resolved, Some(&frame), store, in_progress) {
                Ok(child) => {
                    scanned.deps.extend(child.deps);
                    scanned.open.extend(child.open);
                }
                Err(err) => tracing::debug!("{err}, skipping"),
            }
        }
        in_progress.remove(path);

        scanned.open.remove(path);
        if scanned.open.is_empty() {
            self.closures
                .insert(path.to_path_buf(), scanned.deps.clone());
        }
        tracing::debug!(
            "scanned {}: {} dependencies",
            path.display(),
            scanned.deps.len()
        );
        Ok(scanned)
    }
}
