//! Compile and link orchestration.
//!
//! [`BuildPipeline`] asks the [`StalenessOracle`](artifex_deps::StalenessOracle)
//! which sources are out of date, compiles them in parallel through a
//! [`CommandRunner`], links when any object changed, and persists the caches
//! only when everything succeeded.

#![warn(missing_docs)]

pub mod error;
pub mod fs;
pub mod header;
pub mod pipeline;
pub mod pkgconfig;
pub mod runner;

pub use error::BuildError;
pub use pipeline::{BuildOptions, BuildPhase, BuildPipeline, BuildReport, Verbosity};
pub use pkgconfig::{PackageQuery, PkgConfig};
pub use runner::{CommandOutcome, CommandRunner, Invocation, ProcessRunner};
