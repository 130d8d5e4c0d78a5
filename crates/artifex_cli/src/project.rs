//! Locating the project definition.

use std::path::{Path, PathBuf};

use artifex_common::normalize;
use artifex_config::CONFIG_FILE;

use crate::GlobalArgs;

/// Where the project lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLocation {
    /// Directory all relative paths in the definition are resolved against.
    pub root: PathBuf,
    /// The definition file itself.
    pub definition: PathBuf,
}

/// Walks up from `start` looking for the nearest directory containing `artifex.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project from `--config`, or by searching upwards from the
/// current directory.
///
/// `--config` may name the file or the directory containing it.
pub fn locate_project(global: &GlobalArgs) -> Result<ProjectLocation, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let Some(config) = &global.config else {
        let root = find_project_root(&cwd)?;
        return Ok(ProjectLocation {
            definition: root.join(CONFIG_FILE),
            root,
        });
    };

    let path = normalize(&cwd.join(config));
    if path.is_dir() {
        Ok(ProjectLocation {
            definition: path.join(CONFIG_FILE),
            root: path,
        })
    } else {
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.clone());
        Ok(ProjectLocation {
            root,
            definition: path,
        })
    }
}
