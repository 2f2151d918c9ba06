//! Path helpers for configuration-relative files.
//!
//! Source files and the log file named in the configuration may use `~` for
//! the user's home directory and may be relative to the configuration file.

use std::path::{Path, PathBuf};

/// Expands a leading `~` to the value of `$HOME`.
///
/// Paths without a tilde, and tilde paths when `$HOME` is unset, are returned
/// unchanged.
///
/// # Examples
///
/// ```
/// use pamdash::infrastructure::expand_tilde;
///
/// assert_eq!(expand_tilde("/absolute/path"), std::path::PathBuf::from("/absolute/path"));
/// ```
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    match (path, home) {
        ("~", Some(home)) => home,
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}

/// Resolves `path` against `base_dir` after tilde expansion.
///
/// Absolute paths are returned as-is; relative ones are joined onto
/// `base_dir` when one is given.
#[must_use]
pub fn resolve_path(path: &str, base_dir: Option<&Path>) -> PathBuf {
    let expanded = expand_tilde(path);
    match base_dir {
        Some(base) if expanded.is_relative() => base.join(expanded),
        _ => expanded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_the_base_dir() {
        let resolved = resolve_path("data/accounts.csv", Some(Path::new("/etc/pamdash")));
        assert_eq!(resolved, PathBuf::from("/etc/pamdash/data/accounts.csv"));
    }

    #[test]
    fn absolute_paths_ignore_the_base_dir() {
        let resolved = resolve_path("/srv/safes.csv", Some(Path::new("/etc/pamdash")));
        assert_eq!(resolved, PathBuf::from("/srv/safes.csv"));
    }

    #[test]
    fn no_base_dir_keeps_relative_paths() {
        assert_eq!(resolve_path("safes.csv", None), PathBuf::from("safes.csv"));
    }
}
