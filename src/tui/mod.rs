mod browse;
mod details;
mod layout;
mod setup;
pub mod state;
mod theme;

use crate::config::Config;
use crate::discovery;
use crate::pip::PipManager;
use crate::task::{self, OperationRequest};
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use state::{App, AppEvent, AppMode, Focus};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn run(config: Config) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();

    spawn_backend_init(config, tx.clone());

    loop {
        terminal.draw(|f| ui(f, &app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(&mut app, key, &tx);
                }
            }
        }

        // drain background events
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::BackendReady(manager) => {
                    // persist the resolved path so later sessions skip discovery
                    app.config.python_path = Some(manager.python_path().to_path_buf());
                    if let Err(e) = app.config.save() {
                        log::warn!("could not save config: {e}");
                    }
                    app.backend_ready(manager);
                    start_operation(&mut app, OperationRequest::list(), &tx);
                }
                AppEvent::BackendFailed(message) => {
                    app.backend_failed(message);
                }
                AppEvent::Task(task_event) => {
                    app.handle_task_event(task_event);
                }
            }
        }

        // a mutating operation finished: reload the listing
        if !app.busy && app.refresh_pending {
            app.refresh_pending = false;
            start_operation(&mut app, OperationRequest::list(), &tx);
        }

        if app.should_quit {
            break;
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}

/// Discover the interpreter and probe pip off the UI loop.
fn spawn_backend_init(config: Config, tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let event = match discovery::discover_interpreter(&config) {
            None => AppEvent::BackendFailed(
                "could not locate the host application's Python interpreter \
                 (set python_path in the config, or PIPDECK_PYTHON)"
                    .to_string(),
            ),
            Some(path) => probe_interpreter(path).await,
        };
        let _ = tx.send(event);
    });
}

async fn probe_interpreter(path: PathBuf) -> AppEvent {
    match tokio::task::spawn_blocking(move || PipManager::new(path)).await {
        Ok(Ok(manager)) => AppEvent::BackendReady(Arc::new(manager)),
        Ok(Err(e)) => AppEvent::BackendFailed(e.to_string()),
        Err(e) => AppEvent::BackendFailed(format!("interpreter probe failed: {e}")),
    }
}

/// Hand one request to a background worker and bridge its events into the
/// app channel. Overlapping requests are rejected, not queued.
fn start_operation(
    app: &mut App,
    request: OperationRequest,
    tx: &mpsc::UnboundedSender<AppEvent>,
) {
    if app.busy {
        app.push_log("Another operation is still running; request ignored.");
        return;
    }
    let Some(backend) = app.backend.clone() else {
        app.push_log("No interpreter connected.");
        return;
    };

    app.busy = true;
    app.current_kind = Some(request.kind);

    let (task_tx, mut task_rx) = mpsc::unbounded_channel();
    task::spawn_operation(backend, request, task_tx);

    let tx = tx.clone();
    tokio::spawn(async move {
        while let Some(event) = task_rx.recv().await {
            if tx.send(AppEvent::Task(event)).is_err() {
                break;
            }
        }
    });
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &mpsc::UnboundedSender<AppEvent>) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // a visible dialog eats every key until dismissed
    if app.error_message.is_some() || app.info_message.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.error_message = None;
            app.info_message = None;
        }
        return;
    }

    match app.mode {
        AppMode::Loading => {}
        AppMode::Setup => handle_setup_key(app, key, tx),
        AppMode::Browse => handle_browse_key(app, key, tx),
        AppMode::Details => handle_details_key(app, key),
        AppMode::Versions => handle_versions_key(app, key, tx),
    }
}

fn handle_setup_key(app: &mut App, key: KeyEvent, tx: &mpsc::UnboundedSender<AppEvent>) {
    match key.code {
        KeyCode::Char(c) => app.setup_input.push(c),
        KeyCode::Backspace => {
            app.setup_input.pop();
        }
        KeyCode::Enter => {
            let entered = app.setup_input.trim().to_string();
            if entered.is_empty() {
                return;
            }
            app.mode = AppMode::Loading;
            let tx = tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(probe_interpreter(PathBuf::from(entered)).await);
            });
        }
        _ => {}
    }
}

fn handle_browse_key(app: &mut App, key: KeyEvent, tx: &mpsc::UnboundedSender<AppEvent>) {
    if app.focus == Focus::Search {
        match key.code {
            KeyCode::Char(c) => {
                app.input.push(c);
                app.cursor = app.input.len();
                app.apply_filter();
            }
            KeyCode::Backspace => {
                app.input.pop();
                app.cursor = app.input.len();
                app.apply_filter();
            }
            KeyCode::Enter => {
                let name = app.input.trim().to_string();
                if !name.is_empty() {
                    start_operation(app, OperationRequest::search(name), tx);
                }
                app.focus = Focus::Packages;
            }
            KeyCode::Esc | KeyCode::Tab => {
                app.focus = Focus::Packages;
            }
            _ => {}
        }
        return;
    }

    // uninstall confirmation: y fires, anything else cancels
    if let Some(name) = app.pending_uninstall.take() {
        if key.code == KeyCode::Char('y') {
            start_operation(app, OperationRequest::uninstall(name), tx);
        } else {
            app.push_log(format!("Uninstall of {name} cancelled."));
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('/') | KeyCode::Tab => app.focus = Focus::Search,
        KeyCode::Down | KeyCode::Char('j') => {
            if app.selected + 1 < app.filtered.len() {
                app.selected += 1;
            }
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.selected = app.selected.saturating_sub(1);
        }
        KeyCode::Char('r') => {
            start_operation(app, OperationRequest::list(), tx);
        }
        KeyCode::Char('d') => {
            if let Some(name) = app.selected_package().map(|p| p.name.clone()) {
                app.detail_for = name.clone();
                start_operation(app, OperationRequest::details(name), tx);
            }
        }
        KeyCode::Char('v') => {
            if let Some(name) = target_package(app) {
                app.versions_for = name.clone();
                start_operation(app, OperationRequest::versions(name), tx);
            }
        }
        KeyCode::Char('i') => {
            let typed = app.input.trim();
            if typed.is_empty() {
                app.push_log("Type a package name in the search box, then press i.");
            } else {
                // "name==version" installs a pinned version
                let (name, version) = match typed.split_once("==") {
                    Some((n, v)) => (n.trim().to_string(), Some(v.trim().to_string())),
                    None => (typed.to_string(), None),
                };
                start_operation(app, OperationRequest::install(name, version), tx);
            }
        }
        KeyCode::Char('u') => {
            if let Some(name) = app.selected_package().map(|p| p.name.clone()) {
                app.pending_uninstall = Some(name);
            }
        }
        KeyCode::Esc => {
            app.input.clear();
            app.cursor = 0;
            app.apply_filter();
        }
        _ => {}
    }
}

/// The package a name-taking action applies to: the typed name when the
/// search box is non-empty, the table selection otherwise.
fn target_package(app: &App) -> Option<String> {
    let typed = app.input.trim();
    if !typed.is_empty() {
        return Some(typed.split("==").next().unwrap_or(typed).trim().to_string());
    }
    app.selected_package().map(|p| p.name.clone())
}

fn handle_details_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => app.detail_scroll += 1,
        KeyCode::Up | KeyCode::Char('k') => {
            app.detail_scroll = app.detail_scroll.saturating_sub(1)
        }
        KeyCode::Esc | KeyCode::Char('q') => app.mode = AppMode::Browse,
        _ => {}
    }
}

fn handle_versions_key(app: &mut App, key: KeyEvent, tx: &mpsc::UnboundedSender<AppEvent>) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => {
            if app.version_selected + 1 < app.versions.len() {
                app.version_selected += 1;
            }
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.version_selected = app.version_selected.saturating_sub(1);
        }
        KeyCode::Enter => {
            let name = app.versions_for.clone();
            let version = app.versions.get(app.version_selected).cloned();
            app.mode = AppMode::Browse;
            start_operation(app, OperationRequest::install(name, version), tx);
        }
        KeyCode::Esc => app.mode = AppMode::Browse,
        _ => {}
    }
}

fn ui(f: &mut Frame, app: &App) {
    match app.mode {
        AppMode::Loading | AppMode::Setup => setup::render_setup(f, app),
        AppMode::Browse | AppMode::Versions => browse::render_browse(f, app),
        AppMode::Details => details::render_details(f, app),
    }

    if let Some(message) = &app.error_message {
        layout::render_modal(f, "Error", message, theme::ERROR);
    } else if let Some(message) = &app.info_message {
        layout::render_modal(f, "Notice", message, theme::INFO);
    }
}
