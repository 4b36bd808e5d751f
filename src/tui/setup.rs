//! Loading screen and the fatal-error / path-entry screen.

use super::layout;
use super::state::{App, AppMode};
use super::theme;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render_setup(f: &mut Frame, app: &App) {
    let bands = layout::main_layout(f.area());
    layout::render_header(f, "pipdeck — setup", bands[0]);

    if app.mode == AppMode::Loading {
        let msg = Paragraph::new("Locating the host application's Python interpreter...")
            .style(Style::default().fg(theme::DIM))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(msg, bands[1]);
        layout::render_footer(f, "Ctrl+C to quit", bands[2]);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(3)])
        .split(bands[1]);

    let mut lines = vec![Line::from(Span::styled(
        "The package manager cannot start.",
        Style::default().fg(theme::ERROR),
    ))];
    if let Some(error) = &app.fatal_error {
        lines.push(Line::from(""));
        for l in error.lines() {
            lines.push(Line::from(l.to_string()));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(
        "Enter the path to the host application's Python executable below.",
    ));
    let message = Paragraph::new(lines)
        .wrap(ratatui::widgets::Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme::ERROR)),
        );
    f.render_widget(message, rows[0]);

    let input = Paragraph::new(app.setup_input.clone()).block(
        Block::default()
            .title(" Python path ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::ACCENT)),
    );
    f.render_widget(input, rows[1]);
    f.set_cursor_position((
        rows[1].x + 1 + app.setup_input.len() as u16,
        rows[1].y + 1,
    ));

    layout::render_footer(f, "Enter to retry  │  Ctrl+C to quit", bands[2]);
}
