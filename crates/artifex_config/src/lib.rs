//! Parsing, validation and resolution of `artifex.toml` build definitions.
//!
//! This crate reads the project file into a strongly-typed [`ProjectConfig`]
//! and resolves a named target into a [`TargetConfiguration`]: source globs
//! expanded, flag lists flattened, and the compiler driver chosen.

#![warn(missing_docs)]

pub mod driver;
pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use driver::{is_cpp_source, CompilerDriver, Language};
pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_target, ConfigHeader, TargetConfiguration};
pub use types::*;
