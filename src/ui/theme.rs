//! Colors and styles for the interactive remote
//!
//! A dark palette built around the remote's purple, with one style helper
//! per kind of element drawn on screen.

use ratatui::style::{Color, Modifier, Style};

/// Color palette and style helpers
pub struct Theme;

impl Theme {
    // ═══════════════════════════════════════════════════════════════════════
    // PALETTE
    // ═══════════════════════════════════════════════════════════════════════

    /// Background: #0d0b14
    pub const BACKGROUND: Color = Color::Rgb(0x0d, 0x0b, 0x14);

    /// Panels: #1a1626
    pub const PANEL: Color = Color::Rgb(0x1a, 0x16, 0x26);

    /// Primary: #8f4fd9 (remote purple)
    pub const PRIMARY: Color = Color::Rgb(0x8f, 0x4f, 0xd9);

    /// Accent: #f2c14e (amber)
    pub const ACCENT: Color = Color::Rgb(0xf2, 0xc1, 0x4e);

    /// Text: #e6e1f0
    pub const TEXT: Color = Color::Rgb(0xe6, 0xe1, 0xf0);

    /// Dim: #6b6480
    pub const DIM: Color = Color::Rgb(0x6b, 0x64, 0x80);

    /// Power on: #3ddc84
    pub const POWER_ON: Color = Color::Rgb(0x3d, 0xdc, 0x84);

    /// Power off / errors: #ff4d6a
    pub const POWER_OFF: Color = Color::Rgb(0xff, 0x4d, 0x6a);

    // ═══════════════════════════════════════════════════════════════════════
    // STYLE HELPERS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn text() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::BACKGROUND)
    }

    pub fn dimmed() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::DIM)
    }

    /// Border of the panel that has the keyboard
    pub fn border_focused() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Selected device in the list
    pub fn device_selected() -> Style {
        Style::default()
            .fg(Self::BACKGROUND)
            .bg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn device() -> Style {
        Style::default().fg(Self::TEXT)
    }

    /// Power indicator for a known state
    pub fn power(on: bool) -> Style {
        let color = if on { Self::POWER_ON } else { Self::POWER_OFF };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    /// Key name in the help panel
    pub fn keycap() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    /// Mode badge in the status bar
    pub fn mode_badge(typing: bool) -> Style {
        let bg = if typing { Self::ACCENT } else { Self::PRIMARY };
        Style::default()
            .fg(Self::BACKGROUND)
            .bg(bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn status_bar() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::PANEL)
    }

    /// Spinner-ish text while a sweep runs
    pub fn busy() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::ITALIC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_styles_differ() {
        assert_ne!(Theme::power(true), Theme::power(false));
        assert_eq!(Theme::power(true).fg, Some(Theme::POWER_ON));
    }

    #[test]
    fn test_mode_badge_colors() {
        assert_eq!(Theme::mode_badge(false).bg, Some(Theme::PRIMARY));
        assert_eq!(Theme::mode_badge(true).bg, Some(Theme::ACCENT));
    }
}
