//! Executor for pip inside the host application's embedded Python.
//!
//! Every operation is one external `python -m pip ...` invocation with both
//! streams captured. Operation methods fail soft: execution and parse errors
//! degrade to empty/failure sentinels and never cross to callers.

pub mod parser;
pub mod types;

pub use types::{CommandOutput, InstalledPackage, PipError, VersionListing};

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

/// The six operations the front-end needs, behind a trait so the task
/// runner and its tests can run against fakes.
pub trait PipBackend: Send + Sync {
    /// False when the capability probe failed at construction; every
    /// operation must short-circuit in that case.
    fn is_ready(&self) -> bool;
    fn list_packages(&self) -> Vec<InstalledPackage>;
    fn search(&self, name: &str) -> String;
    fn install(&self, name: &str, version: Option<&str>) -> CommandOutput;
    fn uninstall(&self, name: &str) -> CommandOutput;
    fn versions(&self, name: &str) -> VersionListing;
    fn details(&self, name: &str) -> String;
}

const NOT_READY: &str = "pip is not available in the configured interpreter";

/// Build a version-qualified requirement specifier.
pub fn package_spec(name: &str, version: Option<&str>) -> String {
    match version {
        Some(v) => format!("{name}=={v}"),
        None => name.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct PipManager {
    python: PathBuf,
    pip_version: Option<String>,
    ready: bool,
}

impl PipManager {
    /// Validate the interpreter path and probe `pip --version`.
    ///
    /// An invalid path or a spawn-level failure (missing binary, permission
    /// denied) is fatal. An interpreter that runs but has no usable pip
    /// module yields a not-ready instance instead; operations on it
    /// short-circuit without spawning anything.
    pub fn new(python: impl Into<PathBuf>) -> Result<Self, PipError> {
        let python = python.into();
        if python.as_os_str().is_empty() || !python.exists() {
            return Err(PipError::InvalidPath(python));
        }

        let mut manager = Self {
            python,
            pip_version: None,
            ready: false,
        };

        match manager.run_pip(&["--version"]) {
            Ok(output) if output.status.success() => {
                let banner = String::from_utf8_lossy(&output.stdout);
                manager.pip_version = banner.lines().next().map(|l| l.trim().to_string());
                manager.ready = true;
                log::info!(
                    "pip probe ok: {}",
                    manager.pip_version.as_deref().unwrap_or("unknown")
                );
                Ok(manager)
            }
            Ok(output) => {
                log::warn!(
                    "pip probe failed (exit {:?}): {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                Ok(manager)
            }
            Err(e) => match e.kind() {
                ErrorKind::NotFound => Err(PipError::InterpreterMissing(manager.python)),
                ErrorKind::PermissionDenied => Err(PipError::PermissionDenied(manager.python)),
                _ => Err(PipError::CommandFailed {
                    code: None,
                    stderr: e.to_string(),
                }),
            },
        }
    }

    pub fn python_path(&self) -> &std::path::Path {
        &self.python
    }

    /// First line of the probe output, e.g. `pip 24.0 from ...`.
    pub fn pip_version(&self) -> Option<&str> {
        self.pip_version.as_deref()
    }

    fn run_pip(&self, args: &[&str]) -> std::io::Result<Output> {
        let mut cmd = Command::new(&self.python);
        cmd.arg("-m").arg("pip").args(args);
        // never let pip prompt; both streams captured separately
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            // CREATE_NO_WINDOW: no console flash when launched from a GUI host
            cmd.creation_flags(0x0800_0000);
        }
        cmd.output()
    }

    #[cfg(test)]
    fn unverified(python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            pip_version: None,
            ready: false,
        }
    }
}

impl PipBackend for PipManager {
    fn is_ready(&self) -> bool {
        self.ready
    }

    /// `pip list --format=json`, parsed into records. Any execution or
    /// parse error yields an empty list.
    fn list_packages(&self) -> Vec<InstalledPackage> {
        if !self.ready {
            return Vec::new();
        }
        match self.run_pip(&["list", "--format=json"]) {
            Ok(o) if o.status.success() => {
                match parser::parse_package_list(&String::from_utf8_lossy(&o.stdout)) {
                    Ok(packages) => packages,
                    Err(e) => {
                        log::warn!("{e}");
                        Vec::new()
                    }
                }
            }
            Ok(o) => {
                log::warn!(
                    "pip list exited with {:?}: {}",
                    o.status.code(),
                    String::from_utf8_lossy(&o.stderr).trim()
                );
                Vec::new()
            }
            Err(e) => {
                log::warn!("pip list failed to run: {e}");
                Vec::new()
            }
        }
    }

    /// Best-effort opaque text. pip's search endpoint has been disabled
    /// server-side for years; whatever pip prints is surfaced as-is.
    fn search(&self, name: &str) -> String {
        if !self.ready {
            return NOT_READY.to_string();
        }
        match self.run_pip(&["search", name]) {
            Ok(o) if o.status.success() => String::from_utf8_lossy(&o.stdout).to_string(),
            Ok(o) => {
                let stderr = String::from_utf8_lossy(&o.stderr);
                if stderr.trim().is_empty() {
                    String::from_utf8_lossy(&o.stdout).to_string()
                } else {
                    stderr.to_string()
                }
            }
            Err(e) => {
                log::warn!("pip search failed to run: {e}");
                String::new()
            }
        }
    }

    fn install(&self, name: &str, version: Option<&str>) -> CommandOutput {
        if !self.ready {
            return CommandOutput::failure(NOT_READY);
        }
        let spec = package_spec(name, version);
        match self.run_pip(&["install", &spec]) {
            Ok(o) => CommandOutput {
                stdout: String::from_utf8_lossy(&o.stdout).to_string(),
                stderr: String::from_utf8_lossy(&o.stderr).to_string(),
                success: o.status.success(),
            },
            Err(e) => CommandOutput::failure(format!("failed to run pip install: {e}")),
        }
    }

    /// `pip uninstall -y`: confirmation forced, never interactive.
    fn uninstall(&self, name: &str) -> CommandOutput {
        if !self.ready {
            return CommandOutput::failure(NOT_READY);
        }
        match self.run_pip(&["uninstall", "-y", name]) {
            Ok(o) => CommandOutput {
                stdout: String::from_utf8_lossy(&o.stdout).to_string(),
                stderr: String::from_utf8_lossy(&o.stderr).to_string(),
                success: o.status.success(),
            },
            Err(e) => CommandOutput::failure(format!("failed to run pip uninstall: {e}")),
        }
    }

    fn versions(&self, name: &str) -> VersionListing {
        if !self.ready {
            return VersionListing::Unrecognized(NOT_READY.to_string());
        }
        match self.run_pip(&["index", "versions", name]) {
            Ok(o) if o.status.success() => {
                parser::parse_version_listing(&String::from_utf8_lossy(&o.stdout))
            }
            Ok(o) => {
                let stderr = String::from_utf8_lossy(&o.stderr).trim().to_string();
                VersionListing::Unrecognized(stderr)
            }
            Err(e) => VersionListing::Unrecognized(format!("failed to run pip index: {e}")),
        }
    }

    fn details(&self, name: &str) -> String {
        if !self.ready {
            return NOT_READY.to_string();
        }
        match self.run_pip(&["show", name]) {
            Ok(o) if o.status.success() && !o.stdout.is_empty() => {
                String::from_utf8_lossy(&o.stdout).to_string()
            }
            Ok(_) => format!("No information found for package '{name}'."),
            Err(e) => {
                log::warn!("pip show failed to run: {e}");
                format!("No information found for package '{name}'.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_rejects_missing_path() {
        let err = PipManager::new("/definitely/not/a/python").unwrap_err();
        assert!(matches!(err, PipError::InvalidPath(_)));
    }

    #[test]
    fn construction_rejects_empty_path() {
        let err = PipManager::new("").unwrap_err();
        assert!(matches!(err, PipError::InvalidPath(_)));
    }

    #[test]
    fn not_ready_operations_short_circuit() {
        // The path does not exist, so any attempt to actually spawn the
        // interpreter would error loudly; the sentinels below prove the
        // readiness check fires first.
        let manager = PipManager::unverified("/definitely/not/a/python");
        assert!(!manager.is_ready());

        assert!(manager.list_packages().is_empty());
        assert_eq!(manager.search("requests"), NOT_READY);
        assert_eq!(manager.details("requests"), NOT_READY);

        let install = manager.install("requests", Some("2.31.0"));
        assert!(!install.success);
        assert!(install.error_text().contains("not available"));

        let uninstall = manager.uninstall("requests");
        assert!(!uninstall.success);

        assert!(matches!(
            manager.versions("requests"),
            VersionListing::Unrecognized(_)
        ));
    }

    #[test]
    fn package_spec_qualifies_version() {
        assert_eq!(package_spec("foo", Some("2.1")), "foo==2.1");
        assert_eq!(package_spec("foo", None), "foo");
    }
}
