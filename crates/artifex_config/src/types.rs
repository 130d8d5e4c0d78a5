//! Configuration types deserialized from `artifex.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;

/// The top-level project configuration parsed from `artifex.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Named build targets (e.g., "app", "tests").
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
}

/// Project metadata.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    #[serde(default)]
    pub version: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
}

/// Build settings for one linked artifact.
#[derive(Debug, Deserialize)]
pub struct TargetConfig {
    /// Source files or glob patterns, relative to the project root.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub sources: Vec<String>,
    /// Compiler driver used for both compiling and linking.
    #[serde(default = "default_cc")]
    pub cc: String,
    /// Compile flags. A single string is split on whitespace.
    #[serde(
        default = "default_cflags",
        deserialize_with = "deserialize_string_or_vec"
    )]
    pub cflags: Vec<String>,
    /// Directories searched for quoted includes, in order.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub include_dirs: Vec<String>,
    /// Link libraries. Bare names become `-l<name>`, flags pass through.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub libs: Vec<String>,
    /// Packages queried through `pkg-config` for extra flags and libraries.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub packages: Vec<String>,
    /// Directory receiving the linked artifact.
    #[serde(default = "default_outdir")]
    pub outdir: String,
    /// Directory receiving object files and cache files.
    #[serde(default = "default_objdir")]
    pub objdir: String,
    /// Optional configuration header generated before compiling.
    #[serde(default)]
    pub config_header: Option<ConfigHeaderSpec>,
}

/// A generated `#define` header.
#[derive(Debug, Deserialize)]
pub struct ConfigHeaderSpec {
    /// Output path of the header, relative to the project root.
    pub path: String,
    /// Include guard macro. Derived from the file name when omitted.
    #[serde(default)]
    pub guard: Option<String>,
    /// Macro definitions, emitted in key order.
    #[serde(default)]
    pub defines: BTreeMap<String, DefineValue>,
}

/// The value of one configuration macro.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DefineValue {
    /// `true` defines the macro as `1`; `false` leaves it undefined.
    Flag(bool),
    /// An integer literal.
    Integer(i64),
    /// Emitted verbatim; quote it yourself for string macros.
    Text(String),
}

fn default_cc() -> String {
    "gcc".to_string()
}

fn default_cflags() -> Vec<String> {
    vec!["-g".to_string()]
}

fn default_outdir() -> String {
    "bin".to_string()
}

fn default_objdir() -> String {
    "obj".to_string()
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows `cflags = "-g -Wall"` as well as `cflags = ["-g", "-Wall"]`.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    const HEADER: &str = r#"
[project]
name = "demo"
"#;

    #[test]
    fn target_defaults() {
        let toml = format!("{HEADER}\n[targets.app]\nsources = \"main.c\"\n");
        let config = load_config_from_str(&toml).unwrap();
        let app = &config.targets["app"];
        assert_eq!(app.sources, vec!["main.c"]);
        assert_eq!(app.cc, "gcc");
        assert_eq!(app.cflags, vec!["-g"]);
        assert_eq!(app.outdir, "bin");
        assert_eq!(app.objdir, "obj");
        assert!(app.include_dirs.is_empty());
        assert!(app.config_header.is_none());
    }

    #[test]
    fn cflags_as_list() {
        let toml = format!(
            "{HEADER}\n[targets.app]\nsources = [\"a.c\", \"b.c\"]\ncflags = [\"-O2\", \"-Wall\"]\n"
        );
        let config = load_config_from_str(&toml).unwrap();
        let app = &config.targets["app"];
        assert_eq!(app.sources.len(), 2);
        assert_eq!(app.cflags, vec!["-O2", "-Wall"]);
    }

    #[test]
    fn define_value_variants() {
        let toml = format!(
            r#"{HEADER}
[targets.app]
sources = "main.c"

[targets.app.config_header]
path = "config.h"

[targets.app.config_header.defines]
HAVE_ZLIB = true
NO_THREADS = false
MAX_JOBS = 8
VERSION = '"1.0"'
"#
        );
        let config = load_config_from_str(&toml).unwrap();
        let header = config.targets["app"].config_header.as_ref().unwrap();
        assert_eq!(header.path, "config.h");
        assert_eq!(header.defines["HAVE_ZLIB"], DefineValue::Flag(true));
        assert_eq!(header.defines["NO_THREADS"], DefineValue::Flag(false));
        assert_eq!(header.defines["MAX_JOBS"], DefineValue::Integer(8));
        assert_eq!(
            header.defines["VERSION"],
            DefineValue::Text("\"1.0\"".to_string())
        );
    }

    #[test]
    fn sources_are_required() {
        let toml = format!("{HEADER}\n[targets.app]\ncc = \"clang\"\n");
        assert!(load_config_from_str(&toml).is_err());
    }
}
