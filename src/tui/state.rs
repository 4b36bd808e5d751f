use crate::config::Config;
use crate::pip::{InstalledPackage, PipBackend, PipManager, VersionListing};
use crate::task::{OperationKind, TaskEvent};
use std::sync::Arc;

// ========== enums ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Waiting for interpreter discovery and the pip probe.
    Loading,
    /// Fatal construction failure or no interpreter found: path entry screen.
    Setup,
    Browse,
    Details,
    Versions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Packages,
    Search,
}

// ========== events ==========

/// Everything the UI loop can receive from background tasks.
#[derive(Debug)]
pub enum AppEvent {
    BackendReady(Arc<PipManager>),
    BackendFailed(String),
    Task(TaskEvent),
}

// ========== app state ==========

pub struct App {
    pub mode: AppMode,
    pub config: Config,
    pub backend: Option<Arc<PipManager>>,
    pub should_quit: bool,

    /// One operation in flight at a time; set on spawn, cleared on Finished.
    pub busy: bool,
    /// Re-run the listing once the current operation finishes.
    pub refresh_pending: bool,
    /// Kind of the operation in flight, used to route `Text` results.
    pub current_kind: Option<OperationKind>,

    // package table
    pub packages: Vec<InstalledPackage>,
    pub filtered: Vec<usize>,
    pub selected: usize,

    // search / install input
    pub focus: Focus,
    pub input: String,
    pub cursor: usize,

    // details view
    pub detail_lines: Vec<String>,
    pub detail_scroll: usize,
    pub detail_for: String,

    // versions popup
    pub versions: Vec<String>,
    pub version_selected: usize,
    pub versions_for: String,

    // log panel
    pub log: Vec<String>,
    pub log_scroll: usize,

    // modals
    pub error_message: Option<String>,
    pub info_message: Option<String>,
    pub fatal_error: Option<String>,

    // setup screen
    pub setup_input: String,

    /// Package awaiting uninstall confirmation (press y).
    pub pending_uninstall: Option<String>,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            mode: AppMode::Loading,
            config,
            backend: None,
            should_quit: false,
            busy: false,
            refresh_pending: false,
            current_kind: None,
            packages: Vec::new(),
            filtered: Vec::new(),
            selected: 0,
            focus: Focus::Packages,
            input: String::new(),
            cursor: 0,
            detail_lines: Vec::new(),
            detail_scroll: 0,
            detail_for: String::new(),
            versions: Vec::new(),
            version_selected: 0,
            versions_for: String::new(),
            log: Vec::new(),
            log_scroll: 0,
            error_message: None,
            info_message: None,
            fatal_error: None,
            setup_input: String::new(),
            pending_uninstall: None,
        }
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        self.log.push(format!("[{stamp}] {}", line.into()));
        self.log_scroll = self.log.len().saturating_sub(1);
    }

    /// Filter the package table against the search input.
    pub fn apply_filter(&mut self) {
        let keyword = self.input.to_lowercase();
        if keyword.is_empty() {
            self.filtered = (0..self.packages.len()).collect();
        } else {
            self.filtered = self
                .packages
                .iter()
                .enumerate()
                .filter(|(_, pkg)| pkg.name.to_lowercase().contains(&keyword))
                .map(|(i, _)| i)
                .collect();
        }
        if self.selected >= self.filtered.len() {
            self.selected = self.filtered.len().saturating_sub(1);
        }
    }

    pub fn selected_package(&self) -> Option<&InstalledPackage> {
        self.filtered
            .get(self.selected)
            .and_then(|&i| self.packages.get(i))
    }

    pub fn backend_ready(&mut self, backend: Arc<PipManager>) {
        if let Some(banner) = backend.pip_version() {
            self.push_log(format!("Connected: {banner}"));
        } else if !backend.is_ready() {
            self.push_log(
                "Warning: pip did not respond inside the configured interpreter; \
                 operations will be refused until that is fixed.",
            );
        }
        self.backend = Some(backend);
        self.mode = AppMode::Browse;
        self.fatal_error = None;
    }

    /// Construction failed: block the package view and ask for a path.
    pub fn backend_failed(&mut self, message: String) {
        self.push_log(format!("Error: {message}"));
        self.fatal_error = Some(message);
        self.mode = AppMode::Setup;
        self.backend = None;
    }

    /// Apply one task-runner notification. Pure state transition; the
    /// caller spawns any follow-up work (pending refresh) itself.
    pub fn handle_task_event(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::Status(line) => {
                self.push_log(line);
            }
            TaskEvent::Packages(packages) => {
                self.packages = packages;
                self.apply_filter();
            }
            TaskEvent::Text(text) => match self.current_kind {
                Some(OperationKind::Search) => {
                    if text.trim().is_empty() {
                        self.push_log("Search returned no output.");
                    } else {
                        for line in text.lines() {
                            self.log.push(format!("  {line}"));
                        }
                        self.log_scroll = self.log.len().saturating_sub(1);
                    }
                }
                Some(OperationKind::GetDetails) => {
                    self.detail_lines = text.lines().map(|s| s.to_string()).collect();
                    self.detail_scroll = 0;
                    self.mode = AppMode::Details;
                }
                Some(OperationKind::Install) | Some(OperationKind::Uninstall) => {
                    self.push_log(text);
                    self.refresh_pending = true;
                    self.info_message = Some(
                        "Done. A restart of the host application may be required \
                         before the change is fully visible."
                            .to_string(),
                    );
                }
                _ => self.push_log(text),
            },
            TaskEvent::Versions(listing) => match listing {
                VersionListing::Versions(versions) if !versions.is_empty() => {
                    self.versions = versions;
                    self.version_selected = 0;
                    self.mode = AppMode::Versions;
                }
                VersionListing::Versions(_) => {
                    let name = self.versions_for.clone();
                    self.push_log(format!("No versions found for {name}."));
                }
                VersionListing::Unrecognized(raw) => {
                    self.push_log("Could not read the version listing; pip said:");
                    for line in raw.lines().take(5) {
                        self.log.push(format!("  {line}"));
                    }
                    self.log_scroll = self.log.len().saturating_sub(1);
                }
            },
            TaskEvent::Error(message) => {
                self.push_log(format!("Error: {message}"));
                self.error_message = Some(message);
            }
            TaskEvent::InstallError(message) => {
                self.push_log(format!("Error: {message}"));
                self.error_message = Some(message);
            }
            TaskEvent::Finished => {
                self.busy = false;
                self.current_kind = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pip::PipError;

    fn app() -> App {
        App::new(Config::default())
    }

    #[test]
    fn construction_failure_blocks_package_view() {
        let mut app = app();
        let err = PipManager::new("/definitely/not/a/python").unwrap_err();
        assert!(matches!(err, PipError::InvalidPath(_)));

        app.backend_failed(err.to_string());
        assert_eq!(app.mode, AppMode::Setup);
        assert!(app.fatal_error.is_some());
        assert!(app.backend.is_none());
    }

    #[test]
    fn finished_clears_busy_flag() {
        let mut app = app();
        app.busy = true;
        app.current_kind = Some(OperationKind::List);
        app.handle_task_event(TaskEvent::Finished);
        assert!(!app.busy);
        assert!(app.current_kind.is_none());
    }

    #[test]
    fn install_error_raises_modal_and_logs() {
        let mut app = app();
        app.current_kind = Some(OperationKind::Install);
        app.handle_task_event(TaskEvent::InstallError(
            "Failed to install foo==2.1: no match".to_string(),
        ));
        assert!(app.error_message.as_deref().unwrap().contains("no match"));
        assert!(app.log.iter().any(|l| l.contains("no match")));
    }

    #[test]
    fn successful_install_queues_refresh_and_restart_notice() {
        let mut app = app();
        app.current_kind = Some(OperationKind::Install);
        app.handle_task_event(TaskEvent::Text("Successfully installed foo==2.1".into()));
        assert!(app.refresh_pending);
        assert!(app.info_message.as_deref().unwrap().contains("restart"));
    }

    #[test]
    fn listing_replaces_snapshot_wholesale() {
        let mut app = app();
        app.packages = vec![InstalledPackage {
            name: "old".into(),
            version: "0.1".into(),
        }];
        app.apply_filter();

        app.handle_task_event(TaskEvent::Packages(vec![
            InstalledPackage {
                name: "requests".into(),
                version: "2.31.0".into(),
            },
            InstalledPackage {
                name: "shapely".into(),
                version: "2.0.4".into(),
            },
        ]));
        assert_eq!(app.packages.len(), 2);
        assert_eq!(app.filtered.len(), 2);
        assert!(!app.packages.iter().any(|p| p.name == "old"));
    }

    #[test]
    fn filter_narrows_table() {
        let mut app = app();
        app.packages = vec![
            InstalledPackage {
                name: "requests".into(),
                version: "2.31.0".into(),
            },
            InstalledPackage {
                name: "shapely".into(),
                version: "2.0.4".into(),
            },
        ];
        app.input = "shap".into();
        app.apply_filter();
        assert_eq!(app.filtered.len(), 1);
        assert_eq!(app.selected_package().unwrap().name, "shapely");
    }

    #[test]
    fn unrecognized_version_listing_goes_to_log_not_popup() {
        let mut app = app();
        app.versions_for = "foo".into();
        app.current_kind = Some(OperationKind::GetVersions);
        app.handle_task_event(TaskEvent::Versions(VersionListing::Unrecognized(
            "ERROR: nothing".into(),
        )));
        assert_ne!(app.mode, AppMode::Versions);
        assert!(app.log.iter().any(|l| l.contains("version listing")));
    }
}
