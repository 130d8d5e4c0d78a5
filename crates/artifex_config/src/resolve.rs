//! Target resolution: turning a [`TargetConfig`] into concrete paths and flags.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};

use artifex_common::normalize;

use crate::driver::CompilerDriver;
use crate::error::ConfigError;
use crate::types::{DefineValue, ProjectConfig, TargetConfig};

/// A fully resolved build target.
///
/// All paths are joined onto the project root and normalized. Package flags
/// are not part of it; the build pipeline queries them per build.
#[derive(Debug, Clone)]
pub struct TargetConfiguration {
    /// The target name; also the file name of the linked artifact.
    pub name: String,
    /// Project root all relative paths were resolved against.
    pub root: PathBuf,
    /// Directory receiving the linked artifact.
    pub outdir: PathBuf,
    /// Shared intermediate directory. Each target keeps its objects and
    /// caches in its own subdirectory, see [`TargetConfiguration::build_dir`].
    pub objdir: PathBuf,
    /// Compiler driver, already upgraded to C++ if needed.
    pub driver: CompilerDriver,
    /// Expanded, de-duplicated source files in declaration order.
    pub sources: Vec<PathBuf>,
    /// Flattened compile flags.
    pub cflags: Vec<String>,
    /// Include search roots, in order.
    pub include_dirs: Vec<PathBuf>,
    /// Link flags derived from the `libs` list.
    pub lib_flags: Vec<String>,
    /// Packages to query through `pkg-config`.
    pub packages: Vec<String>,
    /// Configuration header to generate before compiling.
    pub config_header: Option<ConfigHeader>,
}

/// A resolved configuration header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigHeader {
    /// Absolute output path.
    pub path: PathBuf,
    /// Include guard macro.
    pub guard: String,
    /// Macro definitions in key order.
    pub defines: BTreeMap<String, DefineValue>,
}

impl TargetConfiguration {
    /// Path of the linked artifact.
    pub fn target_path(&self) -> PathBuf {
        self.outdir.join(&self.name)
    }

    /// This target's private intermediate directory, `<objdir>/<name>`.
    pub fn build_dir(&self) -> PathBuf {
        self.objdir.join(&self.name)
    }

    /// Object file produced for `source`.
    ///
    /// Mirrors the source's location relative to the project root inside the
    /// build directory, so `src/util.c` becomes `<objdir>/<name>/src/util.c.o`.
    /// The source suffix is kept so `main.c` and `main.cpp` stay apart.
    /// Sources outside the root keep their full path below the build
    /// directory, and leftover `..` components become `__`.
    pub fn object_path(&self, source: &Path) -> PathBuf {
        let relative = source.strip_prefix(&self.root).unwrap_or(source);
        let mut object = self.build_dir();
        for component in relative.components() {
            match component {
                Component::Normal(part) => object.push(part),
                Component::ParentDir => object.push("__"),
                _ => {}
            }
        }
        object.as_mut_os_string().push(".o");
        object
    }

    /// Object files for all sources, in source order.
    pub fn object_paths(&self) -> Vec<PathBuf> {
        self.sources.iter().map(|s| self.object_path(s)).collect()
    }

    /// The binary dependency/fingerprint cache file.
    pub fn depends_path(&self) -> PathBuf {
        self.build_dir().join(format!("{}.depends", self.name))
    }

    /// The configuration cache file.
    pub fn config_cache_path(&self) -> PathBuf {
        self.build_dir().join(format!("{}.config.json", self.name))
    }

    /// `-I` flags for every include root.
    pub fn include_flags(&self) -> Vec<String> {
        self.include_dirs
            .iter()
            .map(|d| format!("-I{}", d.display()))
            .collect()
    }
}

/// Resolves a named target from the project configuration.
///
/// Expands source globs relative to `root`, flattens whitespace-separated
/// flag strings, maps bare library names to `-l` flags, and upgrades the
/// compiler driver when C++ sources are present.
pub fn resolve_target(
    config: &ProjectConfig,
    target_name: &str,
    root: &Path,
) -> Result<TargetConfiguration, ConfigError> {
    let target = config
        .targets
        .get(target_name)
        .ok_or_else(|| ConfigError::UnknownTarget(target_name.to_string()))?;

    let sources = expand_sources(&target.sources, root)?;
    if sources.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "target '{target_name}' has no source files matching {:?}",
            target.sources
        )));
    }

    let mut driver = CompilerDriver::new(target.cc.trim());
    driver.upgrade_for(&sources);

    let resolved = TargetConfiguration {
        name: target_name.to_string(),
        root: root.to_path_buf(),
        outdir: normalize(&root.join(&target.outdir)),
        objdir: normalize(&root.join(&target.objdir)),
        driver,
        sources,
        cflags: flatten(&target.cflags),
        include_dirs: flatten(&target.include_dirs)
            .iter()
            .map(|d| normalize(&root.join(d)))
            .collect(),
        lib_flags: lib_flags(target),
        packages: flatten(&target.packages),
        config_header: target.config_header.as_ref().map(|spec| {
            let path = normalize(&root.join(&spec.path));
            ConfigHeader {
                guard: spec.guard.clone().unwrap_or_else(|| guard_for(&path)),
                path,
                defines: spec.defines.clone(),
            }
        }),
    };
    check_object_collisions(&resolved)?;
    Ok(resolved)
}

/// Two sources mapping onto one object would race in parallel compiles.
fn check_object_collisions(target: &TargetConfiguration) -> Result<(), ConfigError> {
    let mut seen: HashMap<PathBuf, &Path> = HashMap::new();
    for source in &target.sources {
        if let Some(first) = seen.insert(target.object_path(source), source.as_path()) {
            return Err(ConfigError::ValidationError(format!(
                "target '{}': sources '{}' and '{}' map to the same object file",
                target.name,
                first.display(),
                source.display()
            )));
        }
    }
    Ok(())
}

/// Splits every entry on whitespace and drops empty tokens.
fn flatten(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split_whitespace())
        .map(str::to_string)
        .collect()
}

fn lib_flags(target: &TargetConfig) -> Vec<String> {
    flatten(&target.libs)
        .into_iter()
        .map(|lib| {
            if lib.starts_with('-') || lib.contains('/') || lib.contains('.') {
                lib
            } else {
                format!("-l{lib}")
            }
        })
        .collect()
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expands source entries into files, keeping first-seen order.
///
/// Literal entries are kept even if the file is missing, so the compiler
/// reports it. Glob entries only contribute existing files, sorted.
fn expand_sources(entries: &[String], root: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut sources: Vec<PathBuf> = Vec::new();
    for pattern in entries.iter().flat_map(|e| e.split_whitespace()) {
        let joined = root.join(pattern);
        if !is_glob(pattern) {
            push_unique(&mut sources, normalize(&joined));
            continue;
        }
        let full = joined.to_string_lossy().into_owned();
        let paths = glob::glob(&full).map_err(|e| ConfigError::InvalidGlob {
            pattern: pattern.to_string(),
            reason: e.msg.to_string(),
        })?;
        let mut matched: Vec<PathBuf> = paths
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .map(|p| normalize(&p))
            .collect();
        matched.sort();
        for path in matched {
            push_unique(&mut sources, path);
        }
    }
    Ok(sources)
}

fn push_unique(sources: &mut Vec<PathBuf>, path: PathBuf) {
    if !sources.contains(&path) {
        sources.push(path);
    }
}

fn guard_for(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config.h".to_string());
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect::<String>()
        + "_INCLUDED"
}
