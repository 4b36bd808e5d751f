//! Palette shared by every view.

use ratatui::style::Color;

/// Header and selection accent.
pub const ACCENT: Color = Color::Rgb(120, 190, 250);
/// Panel borders.
pub const BORDER: Color = Color::Rgb(200, 180, 90);
/// Footer key hints.
pub const HINT: Color = Color::Rgb(140, 200, 140);
/// Selected row background.
pub const SEL_BG: Color = Color::Rgb(45, 45, 60);
/// Secondary text.
pub const DIM: Color = Color::Rgb(130, 130, 140);
/// Error dialogs and failure lines.
pub const ERROR: Color = Color::Rgb(230, 110, 110);
/// Info dialogs.
pub const INFO: Color = Color::Rgb(140, 200, 140);
