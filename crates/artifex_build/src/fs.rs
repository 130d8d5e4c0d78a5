//! Directory helpers.

use std::path::Path;

use crate::error::BuildError;

/// Creates `dir` and any missing parents.
///
/// Fails with [`BuildError::DirectoryConflict`] if `dir` or one of its
/// ancestors exists as a regular file.
pub fn ensure_dir(dir: &Path) -> Result<(), BuildError> {
    if dir.is_dir() {
        return Ok(());
    }
    if let Some(file) = dir.ancestors().find(|a| a.is_file()) {
        return Err(BuildError::DirectoryConflict {
            path: file.to_path_buf(),
        });
    }
    std::fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))
}

/// Removes `dir` and everything in it. Returns `false` if it did not exist.
///
/// Refuses to remove a directory that is, or contains, `root`.
pub fn remove_dir(dir: &Path, root: &Path) -> Result<bool, BuildError> {
    if root.starts_with(dir) {
        return Err(BuildError::UnsafeClean {
            path: dir.to_path_buf(),
        });
    }
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(BuildError::io(dir, e)),
    }
}

/// Removes `dir` only if it exists and is empty. Returns whether it did.
pub fn remove_dir_if_empty(dir: &Path) -> Result<bool, BuildError> {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                return Ok(false);
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(BuildError::io(dir, e)),
    }
    std::fs::remove_dir(dir)
        .map(|()| true)
        .map_err(|e| BuildError::io(dir, e))
}

/// Removes a single file. Returns `false` if it did not exist.
pub fn remove_file(path: &Path) -> Result<bool, BuildError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(BuildError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("obj/src/net");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }

    #[test]
    fn file_in_the_way_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("obj");
        std::fs::write(&blocker, "").unwrap();
        let err = ensure_dir(&blocker).unwrap_err();
        assert!(matches!(err, BuildError::DirectoryConflict { ref path } if *path == blocker));
    }

    #[test]
    fn file_ancestor_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("obj");
        std::fs::write(&blocker, "").unwrap();
        let err = ensure_dir(&blocker.join("src")).unwrap_err();
        assert!(matches!(err, BuildError::DirectoryConflict { ref path } if *path == blocker));
    }

    #[test]
    fn remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let removed = remove_dir(&dir.path().join("bin"), dir.path()).unwrap();
        assert!(!removed);
    }

    #[test]
    fn remove_deletes_tree() {
        let dir = tempfile::tempdir().unwrap();
        let obj = dir.path().join("obj");
        std::fs::create_dir_all(obj.join("src")).unwrap();
        std::fs::write(obj.join("src/main.o"), "").unwrap();
        assert!(remove_dir(&obj, dir.path()).unwrap());
        assert!(!obj.exists());
    }

    #[test]
    fn refuses_to_remove_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = remove_dir(dir.path(), dir.path()).unwrap_err();
        assert!(matches!(err, BuildError::UnsafeClean { .. }));
        assert!(dir.path().is_dir());
    }

    #[test]
    fn shared_dir_survives_while_occupied() {
        let dir = tempfile::tempdir().unwrap();
        let obj = dir.path().join("obj");
        std::fs::create_dir_all(obj.join("tool")).unwrap();
        assert!(!remove_dir_if_empty(&obj).unwrap());
        assert!(obj.join("tool").is_dir());

        std::fs::remove_dir(obj.join("tool")).unwrap();
        assert!(remove_dir_if_empty(&obj).unwrap());
        assert!(!obj.exists());
        assert!(!remove_dir_if_empty(&obj).unwrap());
    }

    #[test]
    fn remove_file_reports_presence() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app");
        std::fs::write(&app, "").unwrap();
        assert!(remove_file(&app).unwrap());
        assert!(!remove_file(&app).unwrap());
    }
}
