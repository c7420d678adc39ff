//! Color constants for the terminal user interface.

use ratatui::style::Color;

// Severity palette shared by the order board and the
// notification center

/// Used for overdue items and high risk
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
/// Used for warnings and medium risk
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Used for on-track orders
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
/// Used for header accents
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);
