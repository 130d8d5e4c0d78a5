//! Persistent build state for incremental rebuilds.
//!
//! Each target owns two cache files in its object directory: a binary
//! [`BuildCache`] holding dependency sets, per-file fingerprints and object
//! fingerprints, and a JSON [`ConfigCache`] holding the resolved command-line
//! settings and memoized package queries. Both load fail-safe: a missing,
//! corrupt or incompatible file reads as an empty cache.

#![warn(missing_docs)]

pub mod build_cache;
pub mod config_cache;
pub mod error;
mod format;
pub mod store;

pub use build_cache::{BuildCache, DependencySet};
pub use config_cache::{ConfigCache, PackageFlags, ResolvedSettings};
pub use error::CacheError;
pub use store::{FileRecord, FingerprintStore, Freshness};

/// Version string written into every cache file.
pub const ARTIFEX_VERSION: &str = env!("CARGO_PKG_VERSION");
