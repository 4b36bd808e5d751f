//! Background execution of pip operations.
//!
//! One request runs on one worker at a time; the blocking pip call happens
//! under `spawn_blocking` so the UI loop never stalls. Within a request the
//! event order is fixed: status, then result or error, then `Finished` —
//! and `Finished` fires exactly once on every path, panics included, so the
//! UI can always re-enable its controls.

use crate::pip::{package_spec, InstalledPackage, PipBackend, VersionListing};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    List,
    Search,
    Install,
    Uninstall,
    GetVersions,
    GetDetails,
}

/// One unit of work handed from the UI to a worker. Consumed once.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub kind: OperationKind,
    pub package: Option<String>,
    pub version: Option<String>,
}

impl OperationRequest {
    pub fn list() -> Self {
        Self {
            kind: OperationKind::List,
            package: None,
            version: None,
        }
    }

    pub fn search(name: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Search,
            package: Some(name.into()),
            version: None,
        }
    }

    pub fn install(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            kind: OperationKind::Install,
            package: Some(name.into()),
            version,
        }
    }

    pub fn uninstall(name: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Uninstall,
            package: Some(name.into()),
            version: None,
        }
    }

    pub fn versions(name: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::GetVersions,
            package: Some(name.into()),
            version: None,
        }
    }

    pub fn details(name: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::GetDetails,
            package: Some(name.into()),
            version: None,
        }
    }

    /// Human-readable "starting" line, naming the target package.
    pub fn describe(&self) -> String {
        let name = self.package.as_deref().unwrap_or("?");
        match self.kind {
            OperationKind::List => "Refreshing installed package list...".to_string(),
            OperationKind::Search => format!("Searching for {name}..."),
            OperationKind::Install => {
                format!("Installing {}...", package_spec(name, self.version.as_deref()))
            }
            OperationKind::Uninstall => format!("Uninstalling {name}..."),
            OperationKind::GetVersions => format!("Fetching available versions for {name}..."),
            OperationKind::GetDetails => format!("Fetching details for {name}..."),
        }
    }
}

/// Notifications delivered to the UI, in order, per request.
#[derive(Debug)]
pub enum TaskEvent {
    /// Progress/status line for the log panel.
    Status(String),
    /// Result of a listing operation.
    Packages(Vec<InstalledPackage>),
    /// Result of search / details, or the success line of a mutation.
    Text(String),
    /// Result of a versions query.
    Versions(VersionListing),
    /// Operation failure.
    Error(String),
    /// Install failures get their own channel so the UI can route them
    /// to the critical dialog with the full pip error text.
    InstallError(String),
    /// Terminal cleanup signal; exactly once per request.
    Finished,
}

/// Sends `Finished` when dropped, so the signal survives early returns and
/// worker panics alike.
struct FinishGuard(mpsc::UnboundedSender<TaskEvent>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        let _ = self.0.send(TaskEvent::Finished);
    }
}

/// Run one request against the backend off the UI thread.
///
/// Returns the task handle; callers may await it or rely solely on the
/// event stream, which always terminates with `Finished`.
pub fn spawn_operation(
    backend: Arc<dyn PipBackend>,
    request: OperationRequest,
    tx: mpsc::UnboundedSender<TaskEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _guard = FinishGuard(tx.clone());
        let kind = request.kind;
        let err_tx = tx.clone();

        let worker =
            tokio::task::spawn_blocking(move || execute(backend.as_ref(), &request, &tx));

        if let Err(e) = worker.await {
            log::error!("worker for {kind:?} operation died: {e}");
            let _ = err_tx.send(TaskEvent::Error(format!(
                "unexpected fault during {kind:?} operation: {e}"
            )));
        }
        // _guard drops here: Finished goes out last on every path
    })
}

fn execute(
    backend: &dyn PipBackend,
    request: &OperationRequest,
    tx: &mpsc::UnboundedSender<TaskEvent>,
) {
    let _ = tx.send(TaskEvent::Status(request.describe()));

    match request.kind {
        OperationKind::List => {
            let packages = backend.list_packages();
            let count = packages.len();
            let _ = tx.send(TaskEvent::Packages(packages));
            let _ = tx.send(TaskEvent::Status(format!(
                "Loaded {count} installed package(s)."
            )));
        }
        OperationKind::Search => {
            let Some(name) = request.package.as_deref() else {
                let _ = tx.send(TaskEvent::Error("no package name given for search".into()));
                return;
            };
            let text = backend.search(name);
            let _ = tx.send(TaskEvent::Text(text));
            let _ = tx.send(TaskEvent::Status(format!("Search completed for {name}.")));
        }
        OperationKind::Install => {
            let Some(name) = request.package.as_deref() else {
                let _ = tx.send(TaskEvent::Error("no package name given for install".into()));
                return;
            };
            let spec = package_spec(name, request.version.as_deref());
            let outcome = backend.install(name, request.version.as_deref());
            if outcome.success {
                let _ = tx.send(TaskEvent::Text(format!("Successfully installed {spec}")));
                let _ = tx.send(TaskEvent::Status(format!(
                    "Installation completed for {spec}."
                )));
            } else {
                let _ = tx.send(TaskEvent::InstallError(format!(
                    "Failed to install {spec}: {}",
                    outcome.error_text()
                )));
                let _ = tx.send(TaskEvent::Status(format!("Installation failed for {spec}.")));
            }
        }
        OperationKind::Uninstall => {
            let Some(name) = request.package.as_deref() else {
                let _ = tx.send(TaskEvent::Error(
                    "no package name given for uninstall".into(),
                ));
                return;
            };
            let outcome = backend.uninstall(name);
            if outcome.success {
                let _ = tx.send(TaskEvent::Text(format!("Successfully uninstalled {name}")));
                let _ = tx.send(TaskEvent::Status(format!(
                    "Uninstallation completed for {name}."
                )));
            } else {
                let _ = tx.send(TaskEvent::Error(format!(
                    "Failed to uninstall {name}: {}",
                    outcome.error_text()
                )));
                let _ = tx.send(TaskEvent::Status(format!(
                    "Uninstallation failed for {name}."
                )));
            }
        }
        OperationKind::GetVersions => {
            let Some(name) = request.package.as_deref() else {
                let _ = tx.send(TaskEvent::Error(
                    "no package name given for version lookup".into(),
                ));
                return;
            };
            let listing = backend.versions(name);
            let status = match &listing {
                VersionListing::Versions(v) => {
                    format!("Found {} version(s) for {name}.", v.len())
                }
                VersionListing::Unrecognized(_) => {
                    format!("Version listing for {name} was not recognized.")
                }
            };
            let _ = tx.send(TaskEvent::Versions(listing));
            let _ = tx.send(TaskEvent::Status(status));
        }
        OperationKind::GetDetails => {
            let Some(name) = request.package.as_deref() else {
                let _ = tx.send(TaskEvent::Error(
                    "no package name given for details".into(),
                ));
                return;
            };
            let text = backend.details(name);
            let _ = tx.send(TaskEvent::Text(text));
            let _ = tx.send(TaskEvent::Status(format!("Details loaded for {name}.")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pip::CommandOutput;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Call-counting fake with a mutable installed set.
    struct FakeBackend {
        ready: bool,
        fail_installs: bool,
        calls: AtomicUsize,
        installed: Mutex<Vec<InstalledPackage>>,
    }

    impl FakeBackend {
        fn new() -> Self {
            Self {
                ready: true,
                fail_installs: false,
                calls: AtomicUsize::new(0),
                installed: Mutex::new(vec![InstalledPackage {
                    name: "requests".to_string(),
                    version: "2.31.0".to_string(),
                }]),
            }
        }

        fn failing() -> Self {
            Self {
                fail_installs: true,
                ..Self::new()
            }
        }
    }

    impl PipBackend for FakeBackend {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn list_packages(&self) -> Vec<InstalledPackage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.installed.lock().unwrap().clone()
        }

        fn search(&self, name: &str) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("{name} 1.0 - a fake search hit")
        }

        fn install(&self, name: &str, version: Option<&str>) -> CommandOutput {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_installs {
                return CommandOutput {
                    stdout: String::new(),
                    stderr: "ERROR: no match".to_string(),
                    success: false,
                };
            }
            self.installed.lock().unwrap().push(InstalledPackage {
                name: name.to_string(),
                version: version.unwrap_or("1.0").to_string(),
            });
            CommandOutput {
                stdout: format!("Successfully installed {name}"),
                stderr: String::new(),
                success: true,
            }
        }

        fn uninstall(&self, name: &str) -> CommandOutput {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.installed.lock().unwrap().retain(|p| p.name != name);
            CommandOutput {
                stdout: format!("Successfully uninstalled {name}"),
                stderr: String::new(),
                success: true,
            }
        }

        fn versions(&self, _name: &str) -> VersionListing {
            self.calls.fetch_add(1, Ordering::SeqCst);
            VersionListing::Versions(vec!["1.0".to_string(), "1.1".to_string()])
        }

        fn details(&self, name: &str) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("Name: {name}\nVersion: 1.0")
        }
    }

    async fn run_and_collect(
        backend: Arc<dyn PipBackend>,
        request: OperationRequest,
    ) -> Vec<TaskEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_operation(backend, request, tx);
        handle.await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn finished_count(events: &[TaskEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, TaskEvent::Finished))
            .count()
    }

    #[tokio::test]
    async fn finished_fires_exactly_once_for_every_kind() {
        let requests = vec![
            OperationRequest::list(),
            OperationRequest::search("foo"),
            OperationRequest::install("foo", Some("2.1".to_string())),
            OperationRequest::uninstall("foo"),
            OperationRequest::versions("foo"),
            OperationRequest::details("foo"),
        ];

        for request in requests {
            let kind = request.kind;
            let backend: Arc<dyn PipBackend> = Arc::new(FakeBackend::new());
            let events = run_and_collect(backend, request).await;

            assert_eq!(finished_count(&events), 1, "{kind:?}: finished count");
            assert!(
                matches!(events.last(), Some(TaskEvent::Finished)),
                "{kind:?}: finished must come last"
            );
        }
    }

    #[tokio::test]
    async fn finished_fires_once_on_failure_too() {
        let backend: Arc<dyn PipBackend> = Arc::new(FakeBackend::failing());
        let events = run_and_collect(
            backend,
            OperationRequest::install("foo", Some("2.1".to_string())),
        )
        .await;

        assert_eq!(finished_count(&events), 1);
        assert!(matches!(events.last(), Some(TaskEvent::Finished)));
    }

    #[tokio::test]
    async fn status_comes_first_and_result_before_finished() {
        let backend: Arc<dyn PipBackend> = Arc::new(FakeBackend::new());
        let events = run_and_collect(backend, OperationRequest::list()).await;

        assert!(
            matches!(&events[0], TaskEvent::Status(s) if s.contains("Refreshing")),
            "first event must be the starting status"
        );
        let result_pos = events
            .iter()
            .position(|e| matches!(e, TaskEvent::Packages(_)))
            .expect("listing must emit a Packages event");
        let finished_pos = events
            .iter()
            .position(|e| matches!(e, TaskEvent::Finished))
            .unwrap();
        assert!(result_pos < finished_pos);
    }

    #[tokio::test]
    async fn failed_install_routes_to_detailed_error_channel() {
        let backend: Arc<dyn PipBackend> = Arc::new(FakeBackend::failing());
        let events = run_and_collect(
            backend,
            OperationRequest::install("foo", Some("2.1".to_string())),
        )
        .await;

        let detail = events
            .iter()
            .find_map(|e| match e {
                TaskEvent::InstallError(msg) => Some(msg.clone()),
                _ => None,
            })
            .expect("failed install must emit InstallError");
        assert!(detail.contains("foo==2.1"));
        assert!(detail.contains("no match"));
        assert!(
            !events.iter().any(|e| matches!(e, TaskEvent::Text(_))),
            "a failed install must not emit a success result"
        );
    }

    #[tokio::test]
    async fn successful_install_shows_up_in_next_listing() {
        let fake = Arc::new(FakeBackend::new());
        let backend: Arc<dyn PipBackend> = fake.clone();

        let events = run_and_collect(
            backend.clone(),
            OperationRequest::install("shapely", Some("2.0.4".to_string())),
        )
        .await;
        assert!(events
            .iter()
            .any(|e| matches!(e, TaskEvent::Text(s) if s.contains("shapely"))));

        let events = run_and_collect(backend, OperationRequest::list()).await;
        let listed = events
            .iter()
            .find_map(|e| match e {
                TaskEvent::Packages(p) => Some(p.clone()),
                _ => None,
            })
            .unwrap();
        assert!(listed
            .iter()
            .any(|p| p.name == "shapely" && p.version == "2.0.4"));
    }

    #[tokio::test]
    async fn missing_package_name_yields_error_then_finished() {
        let fake = Arc::new(FakeBackend::new());
        let backend: Arc<dyn PipBackend> = fake.clone();

        let request = OperationRequest {
            kind: OperationKind::Install,
            package: None,
            version: None,
        };
        let events = run_and_collect(backend, request).await;

        assert!(events.iter().any(|e| matches!(e, TaskEvent::Error(_))));
        assert!(matches!(events.last(), Some(TaskEvent::Finished)));
        assert_eq!(
            fake.calls.load(Ordering::SeqCst),
            0,
            "the backend must not be invoked without a package name"
        );
    }
}
