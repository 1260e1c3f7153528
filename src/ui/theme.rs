//! Centralized theming for the flagsort TUI
//!
//! Single source of truth for the colors and styles used by every widget.
//! The active variant is global so `t` can switch it at runtime.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::BorderType;
use std::sync::RwLock;

use crate::config::ThemeVariant;

static THEME_VARIANT: RwLock<ThemeVariant> = RwLock::new(ThemeVariant::Light);

/// Initialize the theme variant (call once at startup)
pub fn init_theme(variant: ThemeVariant) {
    set_theme(variant);
}

/// Set the theme at runtime
pub fn set_theme(variant: ThemeVariant) {
    if let Ok(mut guard) = THEME_VARIANT.write() {
        *guard = variant;
    }
}

pub fn current_theme() -> ThemeVariant {
    THEME_VARIANT.read().map(|g| *g).unwrap_or_default()
}

/// Parse a `#rrggbb` flag color. Anything else falls back to the accent.
pub fn parse_hex_color(hex: &str) -> Color {
    let rgb = hex
        .strip_prefix('#')
        .filter(|h| h.len() == 6 && h.is_ascii())
        .and_then(|h| {
            let channel = |i: usize| u8::from_str_radix(&h[i..i + 2], 16).ok();
            Some((channel(0)?, channel(2)?, channel(4)?))
        });
    match rgb {
        Some((r, g, b)) => Color::Rgb(r, g, b),
        None => colors::fg_accent(),
    }
}

/// Light palette: white panels, slate text
mod light {
    use super::Color;

    pub const BG: Color = Color::Rgb(248, 250, 252); // #f8fafc
    pub const PANEL: Color = Color::Rgb(241, 245, 249); // #f1f5f9
    pub const SELECTION: Color = Color::Rgb(219, 234, 254); // #dbeafe
    pub const BORDER: Color = Color::Rgb(203, 213, 225); // #cbd5e1

    pub const TEXT: Color = Color::Rgb(15, 23, 42); // #0f172a
    pub const SUBTEXT: Color = Color::Rgb(71, 85, 105); // #475569
    pub const MUTED: Color = Color::Rgb(148, 163, 184); // #94a3b8

    pub const BLUE: Color = Color::Rgb(37, 99, 235); // #2563eb
    pub const GREEN: Color = Color::Rgb(22, 163, 74); // #16a34a
    pub const AMBER: Color = Color::Rgb(217, 119, 6); // #d97706
    pub const RED: Color = Color::Rgb(220, 38, 38); // #dc2626
    pub const RED_BG: Color = Color::Rgb(254, 226, 226); // #fee2e2
}

/// Dark palette: slate panels, light text
mod dark {
    use super::Color;

    pub const BG: Color = Color::Rgb(15, 23, 42); // #0f172a
    pub const PANEL: Color = Color::Rgb(30, 41, 59); // #1e293b
    pub const SELECTION: Color = Color::Rgb(51, 65, 85); // #334155
    pub const BORDER: Color = Color::Rgb(71, 85, 105); // #475569

    pub const TEXT: Color = Color::Rgb(241, 245, 249); // #f1f5f9
    pub const SUBTEXT: Color = Color::Rgb(203, 213, 225); // #cbd5e1
    pub const MUTED: Color = Color::Rgb(100, 116, 139); // #64748b

    pub const BLUE: Color = Color::Rgb(96, 165, 250); // #60a5fa
    pub const GREEN: Color = Color::Rgb(74, 222, 128); // #4ade80
    pub const AMBER: Color = Color::Rgb(251, 191, 36); // #fbbf24
    pub const RED: Color = Color::Rgb(248, 113, 113); // #f87171
    pub const RED_BG: Color = Color::Rgb(127, 29, 29); // #7f1d1d
}

macro_rules! palette {
    ($name:ident) => {
        match current_theme() {
            ThemeVariant::Light => light::$name,
            ThemeVariant::Dark => dark::$name,
        }
    };
}

/// Border type helpers
pub mod borders {
    use super::*;

    pub fn popup() -> BorderType {
        BorderType::Rounded
    }

    pub fn panel() -> BorderType {
        BorderType::Plain
    }
}

/// Colors that vary by theme
pub mod colors {
    use super::*;

    pub fn bg_main() -> Color {
        palette!(BG)
    }

    pub fn bg_status() -> Color {
        palette!(PANEL)
    }

    pub fn bg_selection() -> Color {
        palette!(SELECTION)
    }

    pub fn bg_error() -> Color {
        palette!(RED_BG)
    }

    pub fn fg_primary() -> Color {
        palette!(TEXT)
    }

    pub fn fg_secondary() -> Color {
        palette!(SUBTEXT)
    }

    pub fn fg_muted() -> Color {
        palette!(MUTED)
    }

    pub fn fg_accent() -> Color {
        palette!(BLUE)
    }

    pub fn fg_warning() -> Color {
        palette!(AMBER)
    }

    pub fn fg_success() -> Color {
        palette!(GREEN)
    }

    pub fn fg_error() -> Color {
        palette!(RED)
    }

    pub fn border() -> Color {
        palette!(BORDER)
    }

    pub fn border_focused() -> Color {
        palette!(BLUE)
    }
}

/// UI symbols
pub mod symbols {
    pub const CONNECTED: &str = "●";
    pub const DISCONNECTED: &str = "○";
    pub const FLAG_ON: &str = "[x]";
    pub const FLAG_OFF: &str = "[ ]";
    pub const SELECTED: &str = "▶ ";
    pub const UNSELECTED: &str = "  ";
    pub const SUCCESS: &str = "✓";
    pub const FAILURE: &str = "✗";
}

/// Pre-composed styles for common UI elements
pub struct Theme;

impl Theme {
    // === Selection ===

    pub fn selected() -> Style {
        Style::default()
            .bg(colors::bg_selection())
            .fg(colors::fg_primary())
    }

    // === Text ===

    pub fn text() -> Style {
        Style::default()
            .fg(colors::fg_primary())
            .bg(colors::bg_main())
    }

    pub fn text_secondary() -> Style {
        Style::default()
            .fg(colors::fg_secondary())
            .bg(colors::bg_main())
    }

    pub fn text_muted() -> Style {
        Style::default()
            .fg(colors::fg_muted())
            .bg(colors::bg_main())
    }

    pub fn text_bold() -> Style {
        Self::text().add_modifier(Modifier::BOLD)
    }

    pub fn text_accent() -> Style {
        Style::default()
            .fg(colors::fg_accent())
            .bg(colors::bg_main())
    }

    pub fn text_success() -> Style {
        Style::default()
            .fg(colors::fg_success())
            .bg(colors::bg_main())
    }

    pub fn text_error() -> Style {
        Style::default()
            .fg(colors::fg_error())
            .bg(colors::bg_main())
    }

    pub fn text_warning() -> Style {
        Style::default()
            .fg(colors::fg_warning())
            .bg(colors::bg_main())
    }

    // === Status bar ===

    pub fn status_bar() -> Style {
        Style::default()
            .bg(colors::bg_status())
            .fg(colors::fg_primary())
    }

    pub fn status_connected() -> Style {
        Style::default()
            .bg(colors::bg_status())
            .fg(colors::fg_success())
    }

    pub fn status_disconnected() -> Style {
        Style::default()
            .bg(colors::bg_status())
            .fg(colors::fg_error())
    }

    pub fn status_busy() -> Style {
        Style::default()
            .bg(colors::bg_status())
            .fg(colors::fg_warning())
    }

    pub fn status_muted() -> Style {
        Style::default()
            .bg(colors::bg_status())
            .fg(colors::fg_muted())
    }

    pub fn error_bar() -> Style {
        Style::default()
            .bg(colors::bg_error())
            .fg(colors::fg_primary())
    }

    // === Help bar ===

    pub fn help_bar() -> Style {
        Style::default()
            .bg(colors::bg_status())
            .fg(colors::fg_primary())
    }

    pub fn help_key() -> Style {
        Style::default()
            .bg(colors::bg_status())
            .fg(colors::fg_warning())
    }

    pub fn help_desc() -> Style {
        Style::default()
            .bg(colors::bg_status())
            .fg(colors::fg_muted())
    }

    // === Borders ===

    pub fn border() -> Style {
        Style::default().fg(colors::border()).bg(colors::bg_main())
    }

    pub fn border_focused() -> Style {
        Style::default()
            .fg(colors::border_focused())
            .bg(colors::bg_main())
    }

    pub fn main_bg() -> Style {
        Style::default().bg(colors::bg_main())
    }

    pub fn gauge() -> Style {
        Style::default()
            .fg(colors::fg_accent())
            .bg(colors::bg_status())
    }

    pub fn input_highlight() -> Style {
        Style::default()
            .fg(colors::fg_primary())
            .bg(colors::bg_selection())
            .add_modifier(Modifier::BOLD)
    }
}

/// Selection background for the whole row, main background otherwise
pub fn with_selection_bg(style: Style, selected: bool) -> Style {
    if selected {
        style.bg(colors::bg_selection())
    } else {
        style.bg(colors::bg_main())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ef4444"), Color::Rgb(0xef, 0x44, 0x44));
        assert_eq!(parse_hex_color("#3B82F6"), Color::Rgb(0x3b, 0x82, 0xf6));
    }

    #[test]
    fn test_parse_hex_color_rejects_garbage() {
        let accent = colors::fg_accent();
        for bad in ["ef4444", "#fff", "#gggggg", "#ef44445", "#é4444"] {
            let parsed = parse_hex_color(bad);
            // accent depends on the global variant, which other tests may flip
            assert!(
                parsed == light::BLUE || parsed == dark::BLUE,
                "{} parsed as {:?} (accent {:?})",
                bad,
                parsed,
                accent
            );
        }
    }
}
