//! Data types and error taxonomy for the pip executor.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Captured result of one pip invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: message.into(),
            success: false,
        }
    }

    /// Error text to show the user: stderr when present, stdout otherwise.
    pub fn error_text(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

/// One installed package as reported by `pip list --format=json`.
///
/// Immutable snapshot entry; the whole list is replaced on each refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
}

/// Result of asking the index for the available versions of a package.
///
/// `Unrecognized` means the `Available versions:` line was absent from the
/// output; the raw text is kept so the log can show what pip actually said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionListing {
    Versions(Vec<String>),
    Unrecognized(String),
}

/// Everything that can go wrong below the task runner.
///
/// `InvalidPath`, `InterpreterMissing` and `PermissionDenied` are
/// construction-time and fatal; the rest degrade to soft sentinels inside
/// the operation methods and never cross to callers.
#[derive(Debug, Error)]
pub enum PipError {
    #[error("python interpreter path is not set or does not exist: {0:?}")]
    InvalidPath(PathBuf),

    #[error("python interpreter not found at {0:?}")]
    InterpreterMissing(PathBuf),

    #[error(
        "permission denied running {0:?}; the host installation may require \
         elevated privileges (try running the host application as administrator)"
    )]
    PermissionDenied(PathBuf),

    #[error("pip exited with code {code:?}: {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },

    #[error("could not parse pip output: {0}")]
    Unparseable(String),
}
