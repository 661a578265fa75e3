//! Dashboard screen — fleet-wide power summary and top consumers.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use wattline_core::{Device, PollState, PowerSnapshot};

use crate::action::Action;
use crate::screen::Screen;
use crate::theme;
use crate::widgets::power_fmt::{fmt_age, fmt_power};

pub struct DashboardScreen {
    focused: bool,
    snapshot: Option<Arc<PowerSnapshot>>,
    poll_state: PollState,
    /// Scroll offset for the top-consumers list.
    scroll: usize,
}

impl DashboardScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            snapshot: None,
            poll_state: PollState::Loading,
            scroll: 0,
        }
    }

    /// Devices sorted by power draw descending, non-reporting last.
    fn top_consumers(snapshot: &PowerSnapshot) -> Vec<&Arc<Device>> {
        let mut devices: Vec<&Arc<Device>> = snapshot.devices.iter().collect();
        devices.sort_by(|a, b| {
            b.power_value
                .unwrap_or(f64::MIN)
                .total_cmp(&a.power_value.unwrap_or(f64::MIN))
        });
        devices
    }

    fn render_summary(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Plant Summary ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let label = Style::default().fg(theme::BORDER_GRAY);
        let val = Style::default().fg(theme::GRID_CYAN);

        let lines = match &self.snapshot {
            Some(snapshot) => {
                let unit = snapshot
                    .devices
                    .iter()
                    .find_map(|d| d.unit.as_deref())
                    .unwrap_or("kW");
                let online = snapshot.online_count();
                let total = snapshot.devices.len();
                let offline = total - online;

                vec![
                    Line::from(vec![
                        Span::styled(" Total draw  ", label),
                        Span::styled(
                            fmt_power(snapshot.total_power(), Some(unit)),
                            val.add_modifier(Modifier::BOLD),
                        ),
                    ]),
                    Line::from(vec![
                        Span::styled(" Devices     ", label),
                        Span::styled(format!("{total}"), val),
                        Span::styled("   online ", label),
                        Span::styled(
                            format!("{online}"),
                            Style::default().fg(theme::LIVE_GREEN),
                        ),
                        Span::styled("   offline ", label),
                        Span::styled(
                            format!("{offline}"),
                            Style::default().fg(if offline > 0 {
                                theme::ALERT_RED
                            } else {
                                theme::DIM_WHITE
                            }),
                        ),
                    ]),
                    Line::from(vec![
                        Span::styled(" Updated     ", label),
                        Span::styled(fmt_age(snapshot.timestamp), val),
                    ]),
                ]
            }
            None => vec![Line::from(Span::styled(
                " Waiting for first poll…",
                Style::default().fg(theme::BORDER_GRAY),
            ))],
        };

        let mut lines = lines;
        if let PollState::Error(message) = &self.poll_state {
            lines.push(Line::from(Span::styled(
                format!(" backend unreachable: {message}"),
                Style::default().fg(theme::ALERT_RED),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_consumers(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Top Consumers ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(snapshot) = &self.snapshot else {
            return;
        };
        if snapshot.devices.is_empty() {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    " No devices reported",
                    Style::default().fg(theme::BORDER_GRAY),
                ))),
                inner,
            );
            return;
        }

        let name_col = usize::from(inner.width) / 2;
        let lines: Vec<Line> = Self::top_consumers(snapshot)
            .iter()
            .skip(self.scroll)
            .take(usize::from(inner.height))
            .map(|device| {
                let dot = if device.is_online { "●" } else { "○" };
                let dot_color = if device.is_online {
                    theme::LIVE_GREEN
                } else {
                    theme::ALERT_RED
                };

                let mut name = device.name.clone();
                if name.chars().count() > name_col {
                    name = name.chars().take(name_col.saturating_sub(1)).collect();
                    name.push('…');
                }
                let pad = " ".repeat(name_col.saturating_sub(name.chars().count()) + 1);

                Line::from(vec![
                    Span::raw(" "),
                    Span::styled(dot, Style::default().fg(dot_color)),
                    Span::styled(format!(" {name}"), theme::table_row()),
                    Span::raw(pad),
                    Span::styled(
                        device.power_label(),
                        Style::default().fg(theme::AMBER),
                    ),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), inner);
    }
}

impl Screen for DashboardScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let count = self.snapshot.as_ref().map_or(0, |s| s.devices.len());
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.scroll = (self.scroll + 1).min(count.saturating_sub(1));
                Ok(None)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.scroll = self.scroll.saturating_sub(1);
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::SnapshotUpdated(snapshot) => {
                self.snapshot = Some(Arc::clone(snapshot));
            }
            Action::PollStateChanged(state) => {
                self.poll_state = state.clone();
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let chunks =
            Layout::vertical([Constraint::Length(6), Constraint::Min(3)]).split(area);
        self.render_summary(frame, chunks[0]);
        self.render_consumers(frame, chunks[1]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}
