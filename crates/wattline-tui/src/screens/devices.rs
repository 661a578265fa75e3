//! Devices screen — flat fleet table with status and hierarchy columns.
//!
//! Rows come from the latest realtime snapshot; before the first poll
//! lands the table is seeded from the configuration roster fetched via
//! the plain device-list endpoint, with power shown as `--`.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState};

use wattline_core::{Device, PowerSnapshot};

use crate::action::Action;
use crate::screen::Screen;
use crate::theme;

/// Column the table is ordered by; cycled with `o`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortKey {
    Name,
    Power,
    Status,
}

impl SortKey {
    fn next(self) -> Self {
        match self {
            Self::Name => Self::Power,
            Self::Power => Self::Status,
            Self::Status => Self::Name,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Power => "power",
            Self::Status => "status",
        }
    }
}

pub struct DevicesScreen {
    focused: bool,
    snapshot: Option<Arc<PowerSnapshot>>,
    /// Configuration roster, used until realtime data arrives.
    roster: Option<Arc<Vec<Arc<Device>>>>,
    selected: usize,
    sort: SortKey,
}

impl DevicesScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            snapshot: None,
            roster: None,
            selected: 0,
            sort: SortKey::Name,
        }
    }

    /// The devices to show: realtime snapshot when available, otherwise
    /// the configuration roster.
    fn fleet(&self) -> &[Arc<Device>] {
        match (&self.snapshot, &self.roster) {
            (Some(snapshot), _) => &snapshot.devices,
            (None, Some(roster)) => roster,
            (None, None) => &[],
        }
    }

    fn device_count(&self) -> usize {
        self.fleet().len()
    }

    fn clamp_selection(&mut self) {
        if self.selected >= self.device_count() {
            self.selected = self.device_count().saturating_sub(1);
        }
    }

    /// Devices in the current sort order. Power sorts descending,
    /// non-reporting meters last; status puts offline devices first so
    /// problems surface at the top.
    fn sorted_devices(&self) -> Vec<&Arc<Device>> {
        let mut devices: Vec<&Arc<Device>> = self.fleet().iter().collect();
        match self.sort {
            SortKey::Name => devices.sort_by(|a, b| a.name.cmp(&b.name)),
            SortKey::Power => devices.sort_by(|a, b| {
                b.power_value
                    .unwrap_or(f64::MIN)
                    .total_cmp(&a.power_value.unwrap_or(f64::MIN))
            }),
            SortKey::Status => {
                devices.sort_by(|a, b| a.is_online.cmp(&b.is_online).then(a.name.cmp(&b.name)));
            }
        }
        devices
    }
}

impl Screen for DevicesScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let count = self.device_count();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if count > 0 {
                    self.selected = (self.selected + 1).min(count - 1);
                }
                Ok(None)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                Ok(None)
            }
            KeyCode::Char('g') | KeyCode::Home => {
                self.selected = 0;
                Ok(None)
            }
            KeyCode::Char('G') | KeyCode::End => {
                self.selected = count.saturating_sub(1);
                Ok(None)
            }
            KeyCode::Char('o') => {
                self.sort = self.sort.next();
                self.selected = 0;
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::SnapshotUpdated(snapshot) => {
                self.snapshot = Some(Arc::clone(snapshot));
                self.clamp_selection();
            }
            Action::DevicesLoaded(roster) => {
                self.roster = Some(Arc::clone(roster));
                self.clamp_selection();
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let title = format!(
            " Devices  ·  {} total  ·  sort: {} ",
            self.device_count(),
            self.sort.label()
        );
        let block = Block::default()
            .title(title)
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

        let devices = self.sorted_devices();
        if devices.is_empty() {
            let message = if self.snapshot.is_none() && self.roster.is_none() {
                " Waiting for device list…"
            } else {
                " No devices reported"
            };
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    message,
                    Style::default().fg(theme::BORDER_GRAY),
                ))),
                inner,
            );
            return;
        }

        let header = Row::new(vec![
            Cell::from(" "),
            Cell::from("Name"),
            Cell::from("Location"),
            Cell::from("Power"),
            Cell::from("Fed from"),
        ])
        .style(theme::table_header());

        let rows: Vec<Row> = devices
            .iter()
            .enumerate()
            .map(|(i, device)| {
                let dot = if device.is_online { "●" } else { "○" };
                let dot_color = if device.is_online {
                    theme::LIVE_GREEN
                } else {
                    theme::ALERT_RED
                };

                let parent = device
                    .parent_device_name
                    .clone()
                    .unwrap_or_else(|| {
                        device
                            .parent_device_id
                            .map_or_else(|| "BUS".into(), |id| format!("#{id}"))
                    });

                let style = if i == self.selected {
                    theme::table_selected()
                } else {
                    theme::table_row()
                };

                Row::new(vec![
                    Cell::from(Span::styled(dot, Style::default().fg(dot_color))),
                    Cell::from(device.name.clone()),
                    Cell::from(device.location.clone().unwrap_or_else(|| "─".into())),
                    Cell::from(Span::styled(
                        device.power_label(),
                        Style::default().fg(theme::AMBER),
                    )),
                    Cell::from(parent),
                ])
                .style(style)
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(2),
                Constraint::Percentage(30),
                Constraint::Percentage(25),
                Constraint::Length(12),
                Constraint::Percentage(25),
            ],
        )
        .header(header);

        let mut state = TableState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(table, inner, &mut state);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crossterm::event::KeyModifiers;

    fn make(id: i64, name: &str, power: Option<f64>, online: bool) -> Arc<Device> {
        Arc::new(Device {
            id,
            name: name.into(),
            location: None,
            power_value: power,
            unit: Some("kW".into()),
            is_online: online,
            parent_device_id: None,
            parent_device_name: None,
        })
    }

    fn fleet() -> Arc<PowerSnapshot> {
        Arc::new(PowerSnapshot {
            devices: Arc::new(vec![
                make(1, "Chiller", Some(30.0), true),
                make(2, "Air Handler", Some(80.0), false),
                make(3, "Boiler", None, true),
            ]),
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn roster_fills_table_before_first_poll() {
        let mut screen = DevicesScreen::new();
        assert_eq!(screen.device_count(), 0);

        let roster = Arc::new(vec![make(1, "Chiller", None, true)]);
        screen.update(&Action::DevicesLoaded(roster)).unwrap();
        assert_eq!(screen.device_count(), 1);
        assert_eq!(screen.fleet()[0].power_label(), "--");
    }

    #[test]
    fn snapshot_takes_precedence_over_roster() {
        let mut screen = DevicesScreen::new();
        screen
            .update(&Action::DevicesLoaded(Arc::new(vec![make(
                9,
                "Stale Entry",
                None,
                false,
            )])))
            .unwrap();
        screen.update(&Action::SnapshotUpdated(fleet())).unwrap();

        assert_eq!(screen.device_count(), 3);
        assert!(screen.fleet().iter().all(|d| d.id != 9));
    }

    #[test]
    fn sort_cycles_through_all_keys() {
        let mut screen = DevicesScreen::new();
        screen.update(&Action::SnapshotUpdated(fleet())).unwrap();
        assert_eq!(screen.sort, SortKey::Name);

        let key = KeyEvent::new(KeyCode::Char('o'), KeyModifiers::NONE);
        screen.handle_key_event(key).unwrap();
        assert_eq!(screen.sort, SortKey::Power);
        screen.handle_key_event(key).unwrap();
        assert_eq!(screen.sort, SortKey::Status);
        screen.handle_key_event(key).unwrap();
        assert_eq!(screen.sort, SortKey::Name);
    }

    #[test]
    fn power_sort_puts_non_reporting_last() {
        let mut screen = DevicesScreen::new();
        screen.update(&Action::SnapshotUpdated(fleet())).unwrap();
        screen.sort = SortKey::Power;

        let names: Vec<&str> = screen
            .sorted_devices()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["Air Handler", "Chiller", "Boiler"]);
    }

    #[test]
    fn status_sort_puts_offline_first() {
        let mut screen = DevicesScreen::new();
        screen.update(&Action::SnapshotUpdated(fleet())).unwrap();
        screen.sort = SortKey::Status;

        assert_eq!(screen.sorted_devices()[0].name, "Air Handler");
    }
}
