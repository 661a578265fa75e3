//! Application core — event loop, screen management, action dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Tabs},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wattline_core::{Monitor, PollState};

use crate::action::{Action, Notification, NotificationLevel};
use crate::data_bridge::spawn_data_bridge;
use crate::event::{Event, EventReader};
use crate::screen::{Screen, ScreenId};
use crate::screens::create_screens;
use crate::theme;
use crate::tui::Tui;

/// Ticks (4 Hz) before a notification auto-dismisses.
const NOTIFICATION_TICKS: u32 = 20;

/// Top-level application state and event loop.
pub struct App {
    /// Monitor handle — polling runs in the data bridge task.
    monitor: Monitor,
    /// Current active screen.
    active_screen: ScreenId,
    /// Previous screen for GoBack.
    previous_screen: Option<ScreenId>,
    /// All screens, keyed by ScreenId.
    screens: HashMap<ScreenId, Box<dyn Screen>>,
    /// Whether the app should keep running.
    running: bool,
    /// Latest poll state for the status bar.
    poll_state: PollState,
    /// Active toast notification and its remaining tick budget.
    notification: Option<(Notification, u32)>,
    /// Help overlay visibility.
    help_visible: bool,
    /// Terminal size for responsive layout.
    terminal_size: (u16, u16),
    /// Action sender — screens can dispatch actions through this.
    action_tx: mpsc::UnboundedSender<Action>,
    /// Action receiver — main loop drains this.
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    /// Create a new App around a configured monitor.
    pub fn new(monitor: Monitor) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        Self {
            monitor,
            active_screen: ScreenId::Dashboard,
            previous_screen: None,
            screens: create_screens(),
            running: true,
            poll_state: PollState::Loading,
            notification: None,
            help_visible: false,
            terminal_size: (0, 0),
            action_tx,
            action_rx,
        }
    }

    /// Run the main event loop. This is the heart of the TUI.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::start()?;
        self.terminal_size = tui.size().unwrap_or((80, 24));
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }

        // Start polling and bridge monitor updates into the action loop
        let bridge_cancel = CancellationToken::new();
        let bridge = tokio::spawn(spawn_data_bridge(
            self.monitor.clone(),
            self.action_tx.clone(),
            bridge_cancel.clone(),
        ));

        // Seed the device table from the configuration endpoint so it has
        // rows before the first realtime poll completes.
        self.load_device_roster();

        let mut events = EventReader::spawn();

        info!("TUI event loop started");

        while self.running {
            // 1. Wait for the next event
            let Some(event) = events.next().await else {
                break;
            };

            // 2. Map event → action(s)
            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => {
                    self.action_tx.send(Action::Resize(w, h))?;
                }
                Event::Tick => {
                    self.action_tx.send(Action::Tick)?;
                }
                Event::Render => {
                    self.action_tx.send(Action::Render)?;
                }
            }

            // 3. Drain and process all queued actions
            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        events.stop();
        bridge_cancel.cancel();
        let _ = bridge.await;
        info!("TUI event loop ended");
        Ok(())
    }

    /// Map a key event to an action. Global keys are handled here;
    /// screen-specific keys are delegated to the active screen.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.help_visible {
            // In help mode, Esc or ? closes help
            return match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Ok(Some(Action::ToggleHelp)),
                _ => Ok(None),
            };
        }

        // Global keybindings
        match (key.modifiers, key.code) {
            // Quit
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => return Ok(Some(Action::Quit)),
            (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),

            // Help
            (KeyModifiers::NONE, KeyCode::Char('?')) => return Ok(Some(Action::ToggleHelp)),

            // Manual refresh
            (KeyModifiers::NONE, KeyCode::Char('r')) => return Ok(Some(Action::RefreshNow)),

            // Screen navigation via number keys
            (KeyModifiers::NONE, KeyCode::Char(c @ '1'..='3')) => {
                let n = c as u8 - b'0';
                if let Some(screen) = ScreenId::from_number(n) {
                    return Ok(Some(Action::SwitchScreen(screen)));
                }
            }

            // Tab / Shift+Tab for screen cycling
            (KeyModifiers::NONE, KeyCode::Tab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.next())));
            }
            (KeyModifiers::SHIFT, KeyCode::BackTab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.prev())));
            }

            _ => {}
        }

        // Delegate to the active screen. Esc falls through to
        // GoBack only when the screen doesn't consume it (the diagram
        // screen uses Esc to leave edit mode).
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            let action = screen.handle_key_event(key)?;
            if action.is_some() {
                return Ok(action);
            }
        }

        if key.code == KeyCode::Esc {
            return Ok(Some(Action::GoBack));
        }

        Ok(None)
    }

    /// Process a single action — update app state and propagate to screens.
    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => {
                self.running = false;
            }

            Action::Resize(w, h) => {
                self.terminal_size = (*w, *h);
            }

            Action::SwitchScreen(target) => {
                if *target != self.active_screen {
                    debug!("switching screen: {} → {}", self.active_screen, target);
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(false);
                    }
                    self.previous_screen = Some(self.active_screen);
                    self.active_screen = *target;
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(true);
                    }
                    if *target == ScreenId::Devices {
                        self.load_device_roster();
                    }
                }
            }

            Action::GoBack => {
                if let Some(prev) = self.previous_screen.take() {
                    self.action_tx.send(Action::SwitchScreen(prev))?;
                }
            }

            Action::ToggleHelp => {
                self.help_visible = !self.help_visible;
            }

            Action::RefreshNow => {
                self.monitor.refresh_now();
                self.action_tx
                    .send(Action::Notify(Notification::info("refresh requested")))?;
            }

            Action::SubmitReparents(changes) => {
                self.submit_reparents(changes.clone());
            }

            Action::Notify(notification) => {
                self.notification = Some((notification.clone(), NOTIFICATION_TICKS));
            }

            Action::DismissNotification => {
                self.notification = None;
            }

            Action::PollStateChanged(state) => {
                self.poll_state = state.clone();
                self.broadcast(action)?;
            }

            // Data and save results go to every screen so each stays
            // current regardless of which one is visible.
            Action::SnapshotUpdated(_) | Action::ReparentsSaved(_) | Action::DevicesLoaded(_) => {
                self.broadcast(action)?;
            }

            Action::Tick => {
                if let Some((_, ticks)) = &mut self.notification {
                    *ticks = ticks.saturating_sub(1);
                    if *ticks == 0 {
                        self.notification = None;
                    }
                }
                self.broadcast(action)?;
            }

            // Render is handled in the main loop, not here
            Action::Render => {}

            // Propagate everything else to the active screen
            other => {
                if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                    if let Some(follow_up) = screen.update(other)? {
                        self.action_tx.send(follow_up)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Send an action to every screen.
    fn broadcast(&mut self, action: &Action) -> Result<()> {
        for screen in self.screens.values_mut() {
            if let Some(follow_up) = screen.update(action)? {
                self.action_tx.send(follow_up)?;
            }
        }
        Ok(())
    }

    /// Submit staged hierarchy edits on a background task; the itemized
    /// report comes back through the action channel.
    fn submit_reparents(&self, changes: Vec<wattline_core::ReparentChange>) {
        if changes.is_empty() {
            return;
        }
        let monitor = self.monitor.clone();
        let action_tx = self.action_tx.clone();
        tokio::spawn(async move {
            let report = monitor.reparent_batch(&changes).await;
            if !report.all_succeeded() {
                warn!(summary = %report.summary(), "partial reparent failure");
            }
            let notification = Notification::for_save_report(&report);
            let _ = action_tx.send(Action::ReparentsSaved(Arc::new(report)));
            let _ = action_tx.send(Action::Notify(notification));
        });
    }

    /// Fetch the device roster from the configuration endpoint on a
    /// background task so the device table has rows before realtime data
    /// arrives. Failures are non-fatal; the next poll fills the table.
    fn load_device_roster(&self) {
        let monitor = self.monitor.clone();
        let action_tx = self.action_tx.clone();
        tokio::spawn(async move {
            match monitor.list_devices().await {
                Ok(devices) => {
                    let _ = action_tx.send(Action::DevicesLoaded(Arc::new(devices)));
                }
                Err(error) => {
                    debug!(%error, "device roster fetch failed");
                }
            }
        });
    }

    /// Render the full application frame.
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        // Layout: [screen content] [tab bar] [status bar]
        let layout = Layout::vertical([
            Constraint::Min(1),    // Screen content
            Constraint::Length(1), // Tab bar
            Constraint::Length(1), // Status bar
        ])
        .split(area);

        let content_area = layout[0];
        let tab_area = layout[1];
        let status_area = layout[2];

        if let Some(screen) = self.screens.get(&self.active_screen) {
            screen.render(frame, content_area);
        }

        self.render_tab_bar(frame, tab_area);
        self.render_status_bar(frame, status_area);

        if self.help_visible {
            self.render_help_overlay(frame, area);
        }
    }

    /// Render the bottom tab bar showing all screens.
    fn render_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = ScreenId::ALL
            .iter()
            .map(|&id| {
                let style = if id == self.active_screen {
                    theme::tab_active()
                } else {
                    theme::tab_inactive()
                };
                Line::from(Span::styled(
                    format!(" {} {} ", id.number(), id.label()),
                    style,
                ))
            })
            .collect();

        let tabs = Tabs::new(titles)
            .divider(Span::styled(" ", theme::key_hint()))
            .select(
                ScreenId::ALL
                    .iter()
                    .position(|&s| s == self.active_screen)
                    .unwrap_or(0),
            );

        frame.render_widget(tabs, area);
    }

    /// Render the bottom status bar with poll state and key hints.
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let poll_indicator = match &self.poll_state {
            PollState::Displaying => {
                Span::styled("● live", Style::default().fg(theme::LIVE_GREEN))
            }
            PollState::Refreshing => {
                Span::styled("◐ refreshing", Style::default().fg(theme::AMBER))
            }
            PollState::Loading => {
                Span::styled("○ loading", Style::default().fg(theme::DIM_WHITE))
            }
            PollState::Error(_) => {
                Span::styled("✖ poll error", Style::default().fg(theme::ALERT_RED))
            }
        };

        let mut spans = vec![Span::raw(" "), poll_indicator];

        if let Some((notification, _)) = &self.notification {
            let color = match notification.level {
                NotificationLevel::Success => theme::LIVE_GREEN,
                NotificationLevel::Warning => theme::AMBER,
                NotificationLevel::Error => theme::ALERT_RED,
                NotificationLevel::Info => theme::DIM_WHITE,
            };
            spans.push(Span::styled(" │ ", theme::key_hint()));
            spans.push(Span::styled(
                notification.message.clone(),
                Style::default().fg(color),
            ));
        }

        spans.push(Span::styled(
            " │ ? help  r refresh  q quit",
            theme::key_hint(),
        ));

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    /// Render the help overlay centered on screen.
    fn render_help_overlay(&self, frame: &mut Frame, area: Rect) {
        let help_width = 56u16.min(area.width.saturating_sub(4));
        let help_height = 18u16.min(area.height.saturating_sub(4));

        let x = (area.width.saturating_sub(help_width)) / 2;
        let y = (area.height.saturating_sub(help_height)) / 2;

        let help_area = Rect::new(area.x + x, area.y + y, help_width, help_height);

        // Clear the background
        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            help_area,
        );

        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());

        let inner = block.inner(help_area);
        frame.render_widget(block, help_area);

        let help_text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Navigation",
                Style::default().fg(theme::GRID_CYAN),
            )),
            Line::from(vec![
                Span::styled("  1-3       ", theme::key_hint_key()),
                Span::styled("Jump to screen", theme::key_hint()),
            ]),
            Line::from(vec![
                Span::styled("  Tab       ", theme::key_hint_key()),
                Span::styled("Next screen", theme::key_hint()),
            ]),
            Line::from(vec![
                Span::styled("  j/k ↑/↓   ", theme::key_hint_key()),
                Span::styled("Move selection", theme::key_hint()),
            ]),
            Line::from(vec![
                Span::styled("  Esc       ", theme::key_hint_key()),
                Span::styled("Back / cancel", theme::key_hint()),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "  Diagram",
                Style::default().fg(theme::GRID_CYAN),
            )),
            Line::from(vec![
                Span::styled("  e         ", theme::key_hint_key()),
                Span::styled("Edit parent of selected device", theme::key_hint()),
            ]),
            Line::from(vec![
                Span::styled("  s         ", theme::key_hint_key()),
                Span::styled("Save staged changes", theme::key_hint()),
            ]),
            Line::from(vec![
                Span::styled("  u         ", theme::key_hint_key()),
                Span::styled("Discard staged changes", theme::key_hint()),
            ]),
            Line::from(vec![
                Span::styled("  o         ", theme::key_hint_key()),
                Span::styled("Cycle sort (devices screen)", theme::key_hint()),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled("  r         ", theme::key_hint_key()),
                Span::styled("Refresh now        ", theme::key_hint()),
                Span::styled("q  ", theme::key_hint_key()),
                Span::styled("Quit", theme::key_hint()),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "                     Esc or ? to close",
                theme::key_hint(),
            )),
        ];

        frame.render_widget(Paragraph::new(help_text), inner);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wattline_core::MonitorConfig;

    fn app() -> App {
        let config = MonitorConfig::new("http://emon.plant.local:8080".parse().unwrap());
        App::new(Monitor::new(config).unwrap())
    }

    #[tokio::test]
    async fn manual_refresh_raises_an_info_toast() {
        let mut app = app();
        app.process_action(&Action::RefreshNow).unwrap();

        let action = app.action_rx.try_recv().unwrap();
        match action {
            Action::Notify(notification) => {
                assert_eq!(notification.level, NotificationLevel::Info);
            }
            other => panic!("expected Notify, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn switching_screens_tracks_previous() {
        let mut app = app();
        app.process_action(&Action::SwitchScreen(ScreenId::Devices))
            .unwrap();
        assert_eq!(app.active_screen, ScreenId::Devices);
        assert_eq!(app.previous_screen, Some(ScreenId::Dashboard));
    }
}
