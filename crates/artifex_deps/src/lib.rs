//! Include scanning and staleness decisions.
//!
//! [`PathResolver`] maps include names to files, [`IncludeScanner`] walks
//! quoted `#include` directives to build each source's transitive
//! [`DependencySet`](artifex_cache::DependencySet), and [`StalenessOracle`]
//! decides whether an object file must be recompiled.

#![warn(missing_docs)]

pub mod error;
pub mod oracle;
pub mod resolver;
pub mod scanner;

pub use error::{ResolveError, ScanError};
pub use oracle::{DirtyReason, EntryState, StalenessOracle};
pub use resolver::{PathResolver, ScanScope};
pub use scanner::{include_names, IncludeScanner};
