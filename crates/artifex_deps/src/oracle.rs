//! Staleness decisions for (source, object) pairs.
//!
//! An object is dirty when it does not exist, when any file in its source's
//! dependency set is missing or has different content than last recorded,
//! or when any dependency's content is newer than the object. Touching a
//! file without editing it does not make it newer.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use artifex_cache::{BuildCache, DependencySet, Freshness};
use artifex_common::{normalize, Fingerprint, ModTime};

use crate::resolver::PathResolver;
use crate::scanner::IncludeScanner;

/// Why an object must be recompiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtyReason {
    /// The object file does not exist.
    MissingObject,
    /// A dependency no longer exists.
    MissingInput(PathBuf),
    /// A dependency's content differs from the recorded fingerprint.
    ChangedInput(PathBuf),
    /// A dependency's content is newer than the object.
    NewerInput(PathBuf),
}

impl fmt::Display for DirtyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirtyReason::MissingObject => write!(f, "object missing"),
            DirtyReason::MissingInput(path) => write!(f, "{} missing", path.display()),
            DirtyReason::ChangedInput(path) => write!(f, "{} changed", path.display()),
            DirtyReason::NewerInput(path) => write!(f, "{} newer than object", path.display()),
        }
    }
}

/// Per-pair state within one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    /// Not yet asked about.
    Unknown,
    /// Up to date.
    Clean,
    /// Must be recompiled.
    Dirty(DirtyReason),
    /// A compile was attempted and failed; the next query re-evaluates.
    Invalidated,
}

/// Decides whether objects need recompiling and records successful compiles.
///
/// Verdicts are memoized per (source, object) pair for the oracle's
/// lifetime. Create one oracle per build.
#[derive(Debug)]
pub struct StalenessOracle {
    scanner: IncludeScanner,
    states: HashMap<(PathBuf, PathBuf), EntryState>,
}

impl StalenessOracle {
    /// Creates an oracle resolving includes through `resolver`.
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            scanner: IncludeScanner::new(resolver),
            states: HashMap::new(),
        }
    }

    /// The current state of a pair.
    pub fn state(&self, source: &Path, object: &Path) -> EntryState {
        self.states
            .get(&key(source, object))
            .cloned()
            .unwrap_or(EntryState::Unknown)
    }

    /// Returns `true` if `object` must be rebuilt from `source`.
    ///
    /// A dirty verdict evicts the source's dependency set and the object's
    /// fingerprint from `cache`; both are re-established by
    /// [`record_compiled`](Self::record_compiled).
    pub fn is_dirty(&mut self, source: &Path, object: &Path, cache: &mut BuildCache) -> bool {
        let key = key(source, object);
        match self.states.get(&key) {
            Some(EntryState::Clean) => return false,
            Some(EntryState::Dirty(_)) => return true,
            _ => {}
        }

        let verdict = self.evaluate(&key.0, &key.1, cache);
        match &verdict {
            EntryState::Dirty(reason) => {
                tracing::debug!("{} is dirty: {reason}", key.1.display());
                cache.evict_dependencies(&key.0);
                cache.evict_object(&key.1);
            }
            _ => tracing::debug!("{} is up to date", key.1.display()),
        }
        let dirty = matches!(verdict, EntryState::Dirty(_));
        self.states.insert(key, verdict);
        dirty
    }

    /// Records a successful compile of `source` into `object`.
    ///
    /// Rescans the source's includes and fingerprints the new object.
    pub fn record_compiled(&mut self, source: &Path, object: &Path, cache: &mut BuildCache) {
        let key = key(source, object);
        let deps = self.scanner.scan(&key.0, cache.store_mut());
        cache.set_dependencies(&key.0, deps);
        match Fingerprint::of_file(&key.1) {
            Ok(fingerprint) => cache.record_object(&key.1, fingerprint),
            Err(err) => {
                tracing::warn!("{}: {err}", key.1.display());
                cache.evict_object(&key.1);
            }
        }
        self.states.insert(key, EntryState::Clean);
    }

    /// Marks a pair whose compile failed.
    ///
    /// Its cache records are dropped so no later decision relies on them.
    pub fn invalidate(&mut self, source: &Path, object: &Path, cache: &mut BuildCache) {
        let key = key(source, object);
        cache.evict_dependencies(&key.0);
        cache.evict_object(&key.1);
        self.states.insert(key, EntryState::Invalidated);
    }

    fn evaluate(&mut self, source: &Path, object: &Path, cache: &mut BuildCache) -> EntryState {
        let deps = self.dependencies(source, cache);

        let Some(baseline) = object_baseline(object, cache) else {
            return EntryState::Dirty(DirtyReason::MissingObject);
        };

        let store = cache.store_mut();
        let inputs = std::iter::once(source).chain(deps.iter().map(PathBuf::as_path));
        for dep in inputs {
            match store.check(dep) {
                Freshness::Missing => {
                    return EntryState::Dirty(DirtyReason::MissingInput(dep.to_path_buf()))
                }
                Freshness::Changed => {
                    return EntryState::Dirty(DirtyReason::ChangedInput(dep.to_path_buf()))
                }
                Freshness::Unchanged | Freshness::Touched | Freshness::New => {}
            }
            match store.get(dep) {
                Some(fingerprint) if fingerprint.mtime > baseline => {
                    return EntryState::Dirty(DirtyReason::NewerInput(dep.to_path_buf()))
                }
                Some(_) => {}
                None => return EntryState::Dirty(DirtyReason::MissingInput(dep.to_path_buf())),
            }
        }
        EntryState::Clean
    }

    /// Returns the recorded dependency set, scanning and recording it first
    /// if there is none.
    fn dependencies(&mut self, source: &Path, cache: &mut BuildCache) -> DependencySet {
        if let Some(deps) = cache.dependencies(source) {
            return deps.clone();
        }
        let deps = self.scanner.scan(source, cache.store_mut());
        cache.set_dependencies(source, deps.clone());
        deps
    }
}

/// The modification time an object's inputs are compared against.
///
/// Uses the recorded object fingerprint while the file on disk still carries
/// the recorded time, and fingerprints the object afresh otherwise. Returns
/// `None` if the object does not exist.
fn object_baseline(object: &Path, cache: &mut BuildCache) -> Option<ModTime> {
    let on_disk = ModTime::try_of(object)?;
    if cache.object(object).is_some_and(|fp| fp.mtime == on_disk) {
        return Some(on_disk);
    }
    match Fingerprint::of_file(object) {
        Ok(fingerprint) => {
            cache.record_object(object, fingerprint);
            Some(fingerprint.mtime)
        }
        Err(err) => {
            tracing::debug!("{}: {err}", object.display());
            None
        }
    }
}

fn key(source: &Path, object: &Path) -> (PathBuf, PathBuf) {
    (normalize(source), normalize(object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File, FileTimes};
    use std::time::{Duration, SystemTime};

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_times(FileTimes::new().set_modified(time)).unwrap();
    }

    fn later(secs: u64) -> SystemTime {
        SystemTime::now() + Duration::from_secs(secs)
    }

    /// A project with `main.c -> util.h -> types.h` and a compiled object.
    struct Fixture {
        _dir: tempfile::TempDir,
        source: PathBuf,
        util: PathBuf,
        types: PathBuf,
        object: PathBuf,
        cache_path: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().to_path_buf();
            let source = root.join("main.c");
            let util = root.join("util.h");
            let types = root.join("types.h");
            let object = root.join("obj/main.o");
            fs::write(&source, "#include \"util.h\"\nint main(void) { return 0; }\n").unwrap();
            fs::write(&util, "#include \"types.h\"\n").unwrap();
            fs::write(&types, "typedef int word;\n").unwrap();
            fs::create_dir_all(root.join("obj")).unwrap();
            Self {
                _dir: dir,
                source,
                util,
                types,
                object,
                cache_path: root.join("obj/app.depends"),
            }
        }

        /// Runs one build: compiles if dirty and persists the cache.
        /// Returns whether the object was dirty.
        fn build(&self) -> bool {
            let mut cache = BuildCache::load(&self.cache_path);
            let mut oracle = StalenessOracle::new(PathResolver::default());
            let dirty = oracle.is_dirty(&self.source, &self.object, &mut cache);
            if dirty {
                fs::write(&self.object, "object code").unwrap();
                set_mtime(&self.object, later(10));
                oracle.record_compiled(&self.source, &self.object, &mut cache);
            }
            cache.save().unwrap();
            dirty
        }
    }

    #[test]
    fn first_build_is_dirty_then_clean() {
        let fx = Fixture::new();
        assert!(fx.build());
        assert!(!fx.build());
    }

    #[test]
    fn dependency_set_recorded_after_compile() {
        let fx = Fixture::new();
        fx.build();
        let cache = BuildCache::load(&fx.cache_path);
        let deps = cache.dependencies(&fx.source).unwrap();
        assert!(deps.contains(&fx.source));
        assert!(deps.contains(&fx.util));
        assert!(deps.contains(&fx.types));
        assert!(cache.object(&fx.object).is_some());
    }

    #[test]
    fn transitive_header_edit_makes_dirty() {
        let fx = Fixture::new();
        fx.build();
        fs::write(&fx.types, "typedef long word;\n").unwrap();
        set_mtime(&fx.types, later(60));
        assert!(fx.build());
    }

    #[test]
    fn touch_without_edit_stays_clean() {
        let fx = Fixture::new();
        fx.build();
        set_mtime(&fx.util, later(60));
        assert!(!fx.build());
        assert!(!fx.build());
    }

    #[test]
    fn edit_with_older_mtime_is_dirty() {
        let fx = Fixture::new();
        fx.build();
        fs::write(&fx.util, "#include \"types.h\"\nint extra;\n").unwrap();
        set_mtime(&fx.util, SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        assert!(fx.build());
    }

    #[test]
    fn deleted_object_is_dirty() {
        let fx = Fixture::new();
        fx.build();
        fs::remove_file(&fx.object).unwrap();

        let mut cache = BuildCache::load(&fx.cache_path);
        let mut oracle = StalenessOracle::new(PathResolver::default());
        assert!(oracle.is_dirty(&fx.source, &fx.object, &mut cache));
        assert_eq!(
            oracle.state(&fx.source, &fx.object),
            EntryState::Dirty(DirtyReason::MissingObject)
        );
        assert!(cache.dependencies(&fx.source).is_none());
    }

    #[test]
    fn deleted_header_is_dirty() {
        let fx = Fixture::new();
        fx.build();
        fs::remove_file(&fx.types).unwrap();
        let mut cache = BuildCache::load(&fx.cache_path);
        let mut oracle = StalenessOracle::new(PathResolver::default());
        assert!(oracle.is_dirty(&fx.source, &fx.object, &mut cache));
        assert_eq!(
            oracle.state(&fx.source, &fx.object),
            EntryState::Dirty(DirtyReason::MissingInput(fx.types.clone()))
        );
    }

    #[test]
    fn verdict_is_memoized() {
        let fx = Fixture::new();
        fx.build();
        let mut cache = BuildCache::load(&fx.cache_path);
        let mut oracle = StalenessOracle::new(PathResolver::default());
        assert!(!oracle.is_dirty(&fx.source, &fx.object, &mut cache));

        fs::write(&fx.types, "changed").unwrap();
        set_mtime(&fx.types, later(60));
        assert!(!oracle.is_dirty(&fx.source, &fx.object, &mut cache));
        assert_eq!(oracle.state(&fx.source, &fx.object), EntryState::Clean);
    }

    #[test]
    fn invalidated_pair_is_reevaluated() {
        let fx = Fixture::new();
        let mut cache = BuildCache::load(&fx.cache_path);
        let mut oracle = StalenessOracle::new(PathResolver::default());
        assert!(oracle.is_dirty(&fx.source, &fx.object, &mut cache));

        oracle.invalidate(&fx.source, &fx.object, &mut cache);
        assert_eq!(oracle.state(&fx.source, &fx.object), EntryState::Invalidated);
        assert!(oracle.is_dirty(&fx.source, &fx.object, &mut cache));
    }

    #[test]
    fn new_include_is_tracked_after_recompile() {
        let fx = Fixture::new();
        fx.build();
        let extra = fx.source.with_file_name("extra.h");
        fs::write(&extra, "").unwrap();
        fs::write(&fx.source, "#include \"util.h\"\n#include \"extra.h\"\n").unwrap();
        set_mtime(&fx.source, later(60));
        assert!(fx.build());

        let cache = BuildCache::load(&fx.cache_path);
        assert!(cache.dependencies(&fx.source).unwrap().contains(&extra));
    }

    #[test]
    fn lost_cache_with_newer_object_is_clean() {
        let fx = Fixture::new();
        fx.build();
        fs::remove_file(&fx.cache_path).unwrap();
        assert!(!fx.build());
    }
}
