//! Locating the host application's embedded Python interpreter.
//!
//! Resolution order: explicit config value, `PIPDECK_PYTHON` environment
//! variable, then a platform-specific sweep of the usual spots under the
//! host install prefix. The first candidate that exists wins.

use crate::config::Config;
use std::path::{Path, PathBuf};

/// Windows hosts ship one bundled CPython per release generation.
#[cfg(windows)]
const WINDOWS_PYTHON_DIRS: &[&str] = &[
    "Python312",
    "Python311",
    "Python310",
    "Python39",
    "Python38",
    "Python37",
];

pub fn discover_interpreter(config: &Config) -> Option<PathBuf> {
    if let Some(path) = &config.python_path {
        if path.exists() {
            return Some(path.clone());
        }
        log::warn!("configured interpreter no longer exists: {path:?}");
    }

    if let Ok(env_path) = std::env::var("PIPDECK_PYTHON") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Some(path);
        }
        log::warn!("PIPDECK_PYTHON points at a missing path: {path:?}");
    }

    let prefix = config
        .host_prefix
        .clone()
        .or_else(|| std::env::var("PIPDECK_HOST_PREFIX").ok().map(PathBuf::from))?;

    candidate_paths(&prefix).into_iter().find(|p| p.exists())
}

/// Ordered interpreter candidates beneath a host install prefix.
#[cfg(windows)]
pub fn candidate_paths(prefix: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![prefix.join("python3.exe")];

    for dir in WINDOWS_PYTHON_DIRS {
        candidates.push(prefix.join("apps").join(dir).join("python.exe"));
    }
    for dir in WINDOWS_PYTHON_DIRS {
        candidates.push(prefix.join(dir).join("python.exe"));
    }

    // common OSGeo4W installs live outside the prefix entirely
    candidates.push(PathBuf::from(r"C:\OSGeo4W64\bin\python3.exe"));
    candidates.push(PathBuf::from(r"C:\OSGeo4W\bin\python3.exe"));

    candidates
}

#[cfg(not(windows))]
pub fn candidate_paths(prefix: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![
        prefix.join("bin/python3"),
        prefix.join("python3"),
        prefix.join("bin/python"),
        prefix.join("python"),
    ];

    for minor in ["3.12", "3.11", "3.10", "3.9"] {
        candidates.push(prefix.join(format!("bin/python{minor}")));
        candidates.push(prefix.join(format!("python{minor}")));
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn unix_candidates_start_with_bin_python3() {
        let candidates = candidate_paths(Path::new("/opt/host"));
        assert_eq!(candidates[0], PathBuf::from("/opt/host/bin/python3"));
        assert!(candidates.contains(&PathBuf::from("/opt/host/bin/python3.11")));
    }

    #[cfg(windows)]
    #[test]
    fn windows_candidates_cover_bundled_generations() {
        let candidates = candidate_paths(Path::new(r"C:\Host"));
        assert!(candidates
            .iter()
            .any(|p| p.ends_with(r"apps\Python312\python.exe")));
        assert!(candidates
            .iter()
            .any(|p| p.ends_with(r"bin\python3.exe")));
    }

    #[test]
    fn configured_path_must_exist_to_win() {
        let config = Config {
            python_path: Some(PathBuf::from("/definitely/not/a/python")),
            host_prefix: None,
        };
        // stale config entry falls through and, with no prefix, nothing is found
        std::env::remove_var("PIPDECK_PYTHON");
        std::env::remove_var("PIPDECK_HOST_PREFIX");
        assert!(discover_interpreter(&config).is_none());
    }
}
