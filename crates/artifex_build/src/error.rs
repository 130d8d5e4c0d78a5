//! Errors that abort a build.
//!
//! A failing compiler is not one of them: compile and link failures are
//! reported through [`BuildReport`](crate::BuildReport).

use std::path::PathBuf;

use artifex_cache::CacheError;

/// Fatal build errors.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A directory could not be created because a regular file is in the way.
    #[error("cannot create directory {path}: a file by the same name already exists")]
    DirectoryConflict {
        /// The conflicting file.
        path: PathBuf,
    },

    /// A filesystem operation failed.
    #[error("{path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Refused to remove a directory that contains the project itself.
    #[error("refusing to remove {path}: it contains the project root")]
    UnsafeClean {
        /// The directory that would have been removed.
        path: PathBuf,
    },

    /// Querying a package's flags failed.
    #[error("package '{package}': {reason}")]
    Package {
        /// The package name.
        package: String,
        /// What went wrong.
        reason: String,
    },

    /// The compile worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),

    /// Persisting a cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_conflict_display() {
        let err = BuildError::DirectoryConflict {
            path: PathBuf::from("obj"),
        };
        assert_eq!(
            err.to_string(),
            "cannot create directory obj: a file by the same name already exists"
        );
    }

    #[test]
    fn package_display() {
        let err = BuildError::Package {
            package: "zlib".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "package 'zlib': not found");
    }

    #[test]
    fn cache_error_converts() {
        let err: BuildError = CacheError::Serialization {
            reason: "bad".to_string(),
        }
        .into();
        assert!(matches!(err, BuildError::Cache(_)));
    }
}
