//! Include name resolution.

use std::path::{Path, PathBuf};

use artifex_common::normalize;

use crate::error::ResolveError;

/// The chain of directories of the files currently being scanned.
///
/// Each recursive scan step enters a new scope for the including file's
/// directory; the scope lives on the caller's stack and disappears when the
/// step returns, whichever way it returns.
#[derive(Debug, Clone, Copy)]
pub struct ScanScope<'a> {
    dir: &'a Path,
    parent: Option<&'a ScanScope<'a>>,
}

impl<'a> ScanScope<'a> {
    /// Creates the outermost scope.
    pub fn new(dir: &'a Path) -> Self {
        Self { dir, parent: None }
    }

    /// Creates a nested scope for a file in `dir`.
    pub fn enter<'b>(&'b self, dir: &'b Path) -> ScanScope<'b> {
        ScanScope {
            dir,
            parent: Some(self),
        }
    }

    /// Directories from innermost to outermost.
    pub fn dirs(&self) -> Vec<&Path> {
        let mut dirs = vec![self.dir];
        let mut frame = self.parent;
        while let Some(scope) = frame {
            dirs.push(scope.dir);
            frame = scope.parent;
        }
        dirs
    }
}

/// Resolves include names against scan scopes and configured search roots.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    search_roots: Vec<PathBuf>,
}

impl PathResolver {
    /// Creates a resolver searching `search_roots` in order.
    pub fn new(search_roots: Vec<PathBuf>) -> Self {
        Self { search_roots }
    }

    /// The configured search roots.
    pub fn search_roots(&self) -> &[PathBuf] {
        &self.search_roots
    }

    /// Finds the file an include name refers to.
    ///
    /// Looks in the scope's directories innermost first, then in the search
    /// roots in configuration order. Absolute names are checked as-is.
    pub fn locate(&self, name: &str, scope: Option<&ScanScope<'_>>) -> Result<PathBuf, ResolveError> {
        let requested = Path::new(name);
        if requested.is_absolute() {
            return if requested.is_file() {
                Ok(normalize(requested))
            } else {
                Err(ResolveError::NotFound {
                    name: name.to_string(),
                })
            };
        }

        let scope_dirs = scope.map(ScanScope::dirs).unwrap_or_default();
        scope_dirs
            .into_iter()
            .chain(self.search_roots.iter().map(PathBuf::as_path))
            .map(|dir| dir.join(requested))
            .find(|candidate| candidate.is_file())
            .map(|found| normalize(&found))
            .ok_or_else(|| ResolveError::NotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scope_dirs_innermost_first() {
        let outer = ScanScope::new(Path::new("/proj/src"));
        let inner = outer.enter(Path::new("/proj/src/net"));
        assert_eq!(
            inner.dirs(),
            vec![Path::new("/proj/src/net"), Path::new("/proj/src")]
        );
    }

    #[test]
    fn resolves_relative_to_scope() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("util.h"), "").unwrap();

        let resolver = PathResolver::default();
        let scope = ScanScope::new(dir.path());
        let found = resolver.locate("util.h", Some(&scope)).unwrap();
        assert_eq!(found, dir.path().join("util.h"));
    }

    #[test]
    fn innermost_scope_wins() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("net");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("defs.h"), "outer").unwrap();
        fs::write(nested.join("defs.h"), "inner").unwrap();

        let resolver = PathResolver::default();
        let outer = ScanScope::new(dir.path());
        let inner = outer.enter(&nested);
        assert_eq!(
            resolver.locate("defs.h", Some(&inner)).unwrap(),
            nested.join("defs.h")
        );
    }

    #[test]
    fn falls_back_to_search_roots_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(second.join("api.h"), "").unwrap();
        fs::write(first.join("api.h"), "").unwrap();

        let resolver = PathResolver::new(vec![first.clone(), second]);
        let scope = ScanScope::new(dir.path());
        assert_eq!(
            resolver.locate("api.h", Some(&scope)).unwrap(),
            first.join("api.h")
        );
    }

    #[test]
    fn normalizes_result() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let include = dir.path().join("include");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&include).unwrap();
        fs::write(include.join("api.h"), "").unwrap();

        let resolver = PathResolver::default();
        let scope = ScanScope::new(&src);
        assert_eq!(
            resolver.locate("../include/api.h", Some(&scope)).unwrap(),
            include.join("api.h")
        );
    }

    #[test]
    fn missing_include_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(vec![dir.path().to_path_buf()]);
        let err = resolver.locate("stdio.h", None).unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { ref name } if name == "stdio.h"));
    }

    #[test]
    fn directory_is_not_a_match() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sys")).unwrap();
        let resolver = PathResolver::new(vec![dir.path().to_path_buf()]);
        assert!(resolver.locate("sys", None).is_err());
    }
}
