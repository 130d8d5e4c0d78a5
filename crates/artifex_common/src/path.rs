//! Lexical path normalization.

use std::path::{Component, Path, PathBuf};

/// Normalizes a path without touching the filesystem.
///
/// Removes `.` components and folds `name/..` pairs, so the same header
/// reached through different relative spellings maps to one key. Leading
/// `..` components of a relative path are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_cur_dir() {
        assert_eq!(normalize(Path::new("./src/./a.h")), PathBuf::from("src/a.h"));
    }

    #[test]
    fn folds_parent_dir() {
        assert_eq!(
            normalize(Path::new("src/sub/../include/a.h")),
            PathBuf::from("src/include/a.h")
        );
    }

    #[test]
    fn keeps_leading_parent_dir() {
        assert_eq!(normalize(Path::new("../lib/a.h")), PathBuf::from("../lib/a.h"));
        assert_eq!(normalize(Path::new("a/../../b.h")), PathBuf::from("../b.h"));
    }

    #[test]
    fn parent_of_root_is_root() {
        assert_eq!(normalize(Path::new("/../a.h")), PathBuf::from("/a.h"));
    }

    #[test]
    fn empty_becomes_cur_dir() {
        assert_eq!(normalize(Path::new("a/..")), PathBuf::from("."));
    }
}
