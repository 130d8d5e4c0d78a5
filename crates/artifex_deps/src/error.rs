//! Error types for include resolution and scanning.
//!
//! Neither is fatal to a build: an include that cannot be resolved or read is
//! assumed to be a system header and dropped from the dependency set.

use std::path::PathBuf;

/// An include name could not be found in any search location.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No candidate file exists.
    #[error("include \"{name}\" not found")]
    NotFound {
        /// The include name as written in the directive.
        name: String,
    },
}

/// A file could not be read while scanning for includes.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Reading the file or its metadata failed.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file being scanned.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
