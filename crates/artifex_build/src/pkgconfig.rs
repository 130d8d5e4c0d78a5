//! Package flag discovery through `pkg-config`.

use std::process::Command;

use artifex_cache::{ConfigCache, PackageFlags};

use crate::error::BuildError;

/// Looks up compile and link flags for a package.
pub trait PackageQuery {
    /// Returns the flags for `package`.
    fn query(&self, package: &str) -> Result<PackageFlags, BuildError>;
}

/// Queries a `pkg-config` compatible program.
#[derive(Debug, Clone)]
pub struct PkgConfig {
    program: String,
}

impl Default for PkgConfig {
    fn default() -> Self {
        Self::new("pkg-config")
    }
}

impl PkgConfig {
    /// Uses `program` instead of `pkg-config`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Uses `$PKG_CONFIG` if set, else `pkg-config`.
    pub fn from_env() -> Self {
        std::env::var("PKG_CONFIG")
            .ok()
            .filter(|p| !p.is_empty())
            .map(Self::new)
            .unwrap_or_default()
    }

    fn tokens(&self, flag: &str, package: &str) -> Result<Vec<String>, BuildError> {
        let output = Command::new(&self.program)
            .arg(flag)
            .arg(package)
            .output()
            .map_err(|e| BuildError::Package {
                package: package.to_string(),
                reason: format!("failed to run {}: {e}", self.program),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildError::Package {
                package: package.to_string(),
                reason: stderr.trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .map(str::to_string)
            .collect())
    }
}

impl PackageQuery for PkgConfig {
    fn query(&self, package: &str) -> Result<PackageFlags, BuildError> {
        let flags = PackageFlags {
            cflags: self.tokens("--cflags", package)?,
            libs: self.tokens("--libs", package)?,
        };
        tracing::debug!("pkg-config {package}: {:?}, {:?}", flags.cflags, flags.libs);
        Ok(flags)
    }
}

/// Collects the flags of all `packages`, in order.
///
/// Each distinct package is queried at most once; answers are memoized in
/// `cache` and reused by later builds.
pub fn resolve_packages(
    packages: &[String],
    cache: &mut ConfigCache,
    query: &dyn PackageQuery,
) -> Result<PackageFlags, BuildError> {
    let mut combined = PackageFlags::default();
    for package in packages {
        let flags = match cache.package(package) {
            Some(flags) => flags.clone(),
            None => {
                let flags = query.query(package)?;
                cache.record_package(package, flags.clone());
                flags
            }
        };
        combined.cflags.extend(flags.cflags);
        combined.libs.extend(flags.libs);
    }
    Ok(combined)
}
