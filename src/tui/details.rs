use super::layout;
use super::state::App;
use ratatui::Frame;

pub fn render_details(f: &mut Frame, app: &App) {
    let bands = layout::main_layout(f.area());
    layout::render_header(f, "pipdeck — package details", bands[0]);
    layout::render_scrollable_content(
        f,
        &format!("pip show {}", app.detail_for),
        &app.detail_lines,
        app.detail_scroll,
        bands[1],
    );
    layout::render_footer(f, "j/k scroll  │  Esc back", bands[2]);
}
