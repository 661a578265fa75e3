//! Control-room palette and semantic styling for the TUI.

use ratatui::style::{Color, Modifier, Style};

// ── Core Palette ──────────────────────────────────────────────────────

pub const GRID_CYAN: Color = Color::Rgb(102, 217, 239); // #66d9ef
pub const AMBER: Color = Color::Rgb(253, 185, 51); // #fdb933
pub const LIVE_GREEN: Color = Color::Rgb(80, 250, 123); // #50fa7b
pub const ALERT_RED: Color = Color::Rgb(255, 99, 99); // #ff6363
pub const VIOLET: Color = Color::Rgb(189, 147, 249); // #bd93f9

// ── Extended Palette ──────────────────────────────────────────────────

pub const DIM_WHITE: Color = Color::Rgb(189, 193, 207); // #bdc1cf
pub const BORDER_GRAY: Color = Color::Rgb(98, 114, 164); // #6272a4
pub const DEAD_GRAY: Color = Color::Rgb(68, 71, 90); // #44475a
pub const BG_HIGHLIGHT: Color = Color::Rgb(40, 42, 54); // #282a36
pub const BG_DARK: Color = Color::Rgb(30, 31, 41); // #1e1f29

// ── Semantic Styles ───────────────────────────────────────────────────

/// Title text for blocks/panels.
pub fn title_style() -> Style {
    Style::default().fg(GRID_CYAN).add_modifier(Modifier::BOLD)
}

/// Border for a focused panel.
pub fn border_focused() -> Style {
    Style::default().fg(AMBER)
}

/// Border for an unfocused panel.
pub fn border_default() -> Style {
    Style::default().fg(BORDER_GRAY)
}

/// Table header row.
pub fn table_header() -> Style {
    Style::default()
        .fg(GRID_CYAN)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
}

/// Normal table row text.
pub fn table_row() -> Style {
    Style::default().fg(DIM_WHITE)
}

/// Selected / highlighted table row.
pub fn table_selected() -> Style {
    Style::default()
        .fg(AMBER)
        .bg(BG_HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

/// Active tab in the tab bar.
pub fn tab_active() -> Style {
    Style::default().fg(AMBER).add_modifier(Modifier::BOLD)
}

/// Inactive tab in the tab bar.
pub fn tab_inactive() -> Style {
    Style::default().fg(DIM_WHITE)
}

/// Key hint text (e.g., "q quit  ? help").
pub fn key_hint() -> Style {
    Style::default().fg(BORDER_GRAY)
}

/// Key hint key character.
pub fn key_hint_key() -> Style {
    Style::default().fg(GRID_CYAN).add_modifier(Modifier::BOLD)
}

// ── Diagram styles ────────────────────────────────────────────────────

/// A supply edge carrying power to an online device.
pub fn edge_live() -> Style {
    Style::default().fg(LIVE_GREEN)
}

/// A supply edge to an offline device.
pub fn edge_dead() -> Style {
    Style::default().fg(DEAD_GRAY)
}

/// Box outline for an online device node.
pub fn node_online() -> Style {
    Style::default().fg(GRID_CYAN)
}

/// Box outline for an offline device node.
pub fn node_offline() -> Style {
    Style::default().fg(DEAD_GRAY)
}

/// The synthetic bus bar at the top of the diagram.
pub fn bus_style() -> Style {
    Style::default().fg(AMBER).add_modifier(Modifier::BOLD)
}

/// Banner shown while stale data is displayed during a fetch error.
pub fn error_banner() -> Style {
    Style::default()
        .fg(ALERT_RED)
        .bg(BG_DARK)
        .add_modifier(Modifier::BOLD)
}

/// Staged (unsaved) hierarchy edit marker.
pub fn staged_edit() -> Style {
    Style::default().fg(VIOLET).add_modifier(Modifier::BOLD)
}
