use super::layout;
use super::state::{App, AppMode, Focus};
use super::theme;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

pub fn render_browse(f: &mut Frame, app: &App) {
    let bands = layout::main_layout(f.area());
    layout::render_header(f, "pipdeck — host Python packages", bands[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(bands[1]);

    render_package_table(f, app, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(columns[1]);
    render_search_input(f, app, right[0]);
    layout::render_scrollable_content(f, "Log", &app.log, app.log_scroll, right[1]);

    layout::render_footer(f, &footer_text(app), bands[2]);

    if app.mode == AppMode::Versions {
        render_versions_popup(f, app);
    }
}

fn render_package_table(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Packages && app.mode == AppMode::Browse;
    let border = if focused { theme::ACCENT } else { theme::BORDER };

    let title = format!(
        " Installed ({}/{}) ",
        app.filtered.len(),
        app.packages.len()
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let visible = inner.height as usize;
    // keep the selection on screen
    let offset = app.selected.saturating_sub(visible.saturating_sub(1));

    let items: Vec<ListItem> = app
        .filtered
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(row, &idx)| {
            let pkg = &app.packages[idx];
            let selected = row == app.selected;
            let name_style = if selected {
                Style::default()
                    .fg(theme::ACCENT)
                    .bg(theme::SEL_BG)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let version_style = if selected {
                Style::default().fg(theme::DIM).bg(theme::SEL_BG)
            } else {
                Style::default().fg(theme::DIM)
            };
            let marker = if selected { "▶ " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{marker}{:<30}", pkg.name), name_style),
                Span::styled(pkg.version.clone(), version_style),
            ]))
        })
        .collect();

    if items.is_empty() {
        let empty = Paragraph::new("  no packages loaded — press r to refresh")
            .style(Style::default().fg(theme::DIM));
        f.render_widget(empty, inner);
    } else {
        f.render_widget(List::new(items), inner);
    }
}

fn render_search_input(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Search && app.mode == AppMode::Browse;
    let border = if focused { theme::ACCENT } else { theme::BORDER };

    let display = if app.input.is_empty() && !focused {
        Span::styled("Search / package name...", Style::default().fg(theme::DIM))
    } else {
        Span::raw(app.input.clone())
    };
    let input = Paragraph::new(Line::from(display)).block(
        Block::default()
            .title(" Search ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    f.render_widget(input, area);

    if focused {
        let x = area.x + 1 + app.cursor.min(app.input.len()) as u16;
        f.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

fn render_versions_popup(f: &mut Frame, app: &App) {
    let height = (app.versions.len() as u16 + 2).clamp(5, f.area().height / 2);
    let area = layout::centered_rect(40, height, f.area());
    f.render_widget(Clear, area);

    let items: Vec<ListItem> = app
        .versions
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let style = if i == app.version_selected {
                Style::default()
                    .fg(theme::ACCENT)
                    .bg(theme::SEL_BG)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Span::styled(format!(" {v}"), style))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(format!(" Versions of {} — Enter to install ", app.versions_for))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::ACCENT)),
    );
    f.render_widget(list, area);
}

fn footer_text(app: &App) -> String {
    let mut parts: Vec<String> = Vec::new();
    if app.busy {
        parts.push("⏳ working...".to_string());
    } else if let Some(name) = &app.pending_uninstall {
        parts.push(format!("press y to uninstall {name}, any other key cancels"));
    } else {
        parts.push(
            "/ search  Enter find  i install  v versions  d details  u uninstall  r refresh  q quit"
                .to_string(),
        );
    }
    if let Some(backend) = &app.backend {
        if let Some(banner) = backend.pip_version() {
            parts.push(banner.to_string());
        }
    }
    parts.join("  │  ")
}
