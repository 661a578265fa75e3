//! Screen identities and the behavior they share.

use std::fmt;

use color_eyre::eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::{Frame, layout::Rect};

use crate::action::Action;

/// Identifies each primary TUI screen, navigable by number keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScreenId {
    #[default]
    Dashboard, // 1
    Diagram, // 2
    Devices, // 3
}

impl ScreenId {
    /// All screens in tab-bar order.
    pub const ALL: [ScreenId; 3] = [Self::Dashboard, Self::Diagram, Self::Devices];

    /// Numeric key (1-3) for this screen.
    pub fn number(self) -> u8 {
        match self {
            Self::Dashboard => 1,
            Self::Diagram => 2,
            Self::Devices => 3,
        }
    }

    /// Screen from a numeric key (1-3). Returns None for out-of-range.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Dashboard),
            2 => Some(Self::Diagram),
            3 => Some(Self::Devices),
            _ => None,
        }
    }

    /// Next screen in tab order (wraps around).
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Previous screen in tab order (wraps around).
    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Short label for the tab bar.
    pub fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Diagram => "Diagram",
            Self::Devices => "Devices",
        }
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the app needs from each screen. The app owns one boxed instance
/// per [`ScreenId`]: keys are routed to the active screen only, while
/// data actions are broadcast to all of them so background screens stay
/// current.
pub trait Screen: Send {
    /// Handle a key routed to this screen. Returning `Some` consumes the
    /// key; `None` lets the app apply its global fallbacks (Esc → back).
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>>;

    /// Apply a dispatched action. May return a follow-up action.
    fn update(&mut self, action: &Action) -> Result<Option<Action>>;

    /// Draw into the given area.
    fn render(&self, frame: &mut Frame, area: Rect);

    /// Toggle the border highlight when the screen gains or loses focus.
    fn set_focused(&mut self, focused: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_cycle_wraps() {
        assert_eq!(ScreenId::Devices.next(), ScreenId::Dashboard);
        assert_eq!(ScreenId::Dashboard.prev(), ScreenId::Devices);
    }

    #[test]
    fn number_round_trips() {
        for id in ScreenId::ALL {
            assert_eq!(ScreenId::from_number(id.number()), Some(id));
        }
        assert_eq!(ScreenId::from_number(9), None);
    }
}
