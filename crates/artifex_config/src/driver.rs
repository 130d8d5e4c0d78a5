//! Compiler driver selection.
//!
//! A target configured with a C driver switches to the matching C++ driver as
//! soon as one of its sources has a C++ suffix. The switch only ever goes from
//! C to C++.

use std::fmt;
use std::path::Path;

/// Source language handled by a driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Language {
    /// C sources only.
    C,
    /// C++ (and C) sources.
    Cpp,
}

/// File suffixes compiled as C++.
const CPP_EXTENSIONS: &[&str] = &["cc", "C", "cxx", "cpp", "c++"];

/// Returns `true` if `path` has a C++ source suffix.
pub fn is_cpp_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| CPP_EXTENSIONS.contains(&ext))
}

/// The compiler executable used for compiling and linking one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerDriver {
    program: String,
    language: Language,
}

impl CompilerDriver {
    /// Creates a driver for `program`, inferring its language from the name.
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let language = if is_cpp_driver_name(driver_name(&program)) {
            Language::Cpp
        } else {
            Language::C
        };
        Self { program, language }
    }

    /// The executable to invoke.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The language this driver currently compiles.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Upgrades to a C++ driver if any of `sources` is a C++ file.
    ///
    /// Returns `true` if the driver changed. A C++ driver is never downgraded.
    pub fn upgrade_for<P: AsRef<Path>>(&mut self, sources: &[P]) -> bool {
        if self.language == Language::Cpp {
            return false;
        }
        if !sources.iter().any(|s| is_cpp_source(s.as_ref())) {
            return false;
        }
        if let Some(program) = cpp_counterpart(&self.program) {
            self.program = program;
        }
        self.language = Language::Cpp;
        true
    }
}

impl fmt::Display for CompilerDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)
    }
}

fn driver_name(program: &str) -> &str {
    Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(program)
}

fn is_cpp_driver_name(name: &str) -> bool {
    name == "c++" || name.contains("g++") || name.contains("clang++")
}

/// Maps a C driver to its C++ sibling, keeping any directory, target prefix
/// (`arm-none-eabi-gcc`) and version suffix (`gcc-13`).
fn cpp_counterpart(program: &str) -> Option<String> {
    let name = driver_name(program);
    let dir = &program[..program.len() - name.len()];
    let mapped = if name == "cc" {
        "c++".to_string()
    } else if let Some(idx) = name.rfind("gcc") {
        format!("{}g++{}", &name[..idx], &name[idx + 3..])
    } else if let Some(idx) = name.rfind("clang") {
        format!("{}clang++{}", &name[..idx], &name[idx + 5..])
    } else {
        return None;
    };
    Some(format!("{dir}{mapped}"))
}
