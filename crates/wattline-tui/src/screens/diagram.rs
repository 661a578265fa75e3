//! Diagram screen — live single-line diagram of the supply hierarchy.
//!
//! Rebuilds the bus-rooted graph and its layout from every snapshot, then
//! paints node boxes and supply edges onto a character canvas. Edges to
//! online devices pulse green; offline feeds go gray. The side panel
//! shows the selected device and any staged (unsaved) parent edits.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use wattline_core::{
    Device, LayoutParams, LayoutedDiagram, NodeId, PollState, PowerSnapshot, ReparentChange,
    build_diagram, layout_diagram,
};

use crate::action::Action;
use crate::screen::Screen;
use crate::theme;

// ── Character canvas ─────────────────────────────────────────────────

/// A styled character grid the diagram is painted onto before being
/// converted into ratatui lines. Out-of-bounds writes are dropped, which
/// is what clips the diagram when it is panned off-screen.
struct Canvas {
    width: usize,
    height: usize,
    cells: Vec<(char, Style)>,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![(' ', Style::default()); width * height],
        }
    }

    fn put(&mut self, x: i32, y: i32, ch: char, style: Style) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x.unsigned_abs() as usize, y.unsigned_abs() as usize);
        if x >= self.width || y >= self.height {
            return;
        }
        self.cells[y * self.width + x] = (ch, style);
    }

    fn into_lines(self) -> Vec<Line<'static>> {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| {
                Line::from(
                    row.iter()
                        .map(|&(ch, style)| Span::styled(ch.to_string(), style))
                        .collect::<Vec<_>>(),
                )
            })
            .collect()
    }
}

// ── Edit mode ────────────────────────────────────────────────────────

/// In-progress parent reassignment for one device.
struct EditState {
    device_id: i64,
    /// Candidate parents: the bus plus every other device, id-ascending.
    candidates: Vec<Option<i64>>,
    idx: usize,
}

// ── Screen state ─────────────────────────────────────────────────────

pub struct DiagramScreen {
    focused: bool,
    snapshot: Option<Arc<PowerSnapshot>>,
    poll_state: PollState,
    layout: Option<LayoutedDiagram>,
    /// Device ids in node order, for j/k selection.
    device_ids: Vec<i64>,
    selected: usize,
    /// Pan offset in cells, applied to all diagram coordinates.
    pan: (i32, i32),
    edit: Option<EditState>,
    /// Staged parent edits, at most one per device.
    staged: Vec<ReparentChange>,
    /// Animation phase, advanced on every tick.
    tick: u64,
}

impl DiagramScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            snapshot: None,
            poll_state: PollState::Loading,
            layout: None,
            device_ids: Vec::new(),
            selected: 0,
            pan: (0, 0),
            edit: None,
            staged: Vec::new(),
            tick: 0,
        }
    }

    /// Rebuild graph and layout from the current snapshot.
    fn rebuild(&mut self) {
        let Some(snapshot) = &self.snapshot else {
            self.layout = None;
            self.device_ids.clear();
            return;
        };

        let graph = build_diagram(&snapshot.devices);
        self.device_ids = graph
            .nodes
            .iter()
            .filter_map(|n| match n.id {
                NodeId::Device(id) => Some(id),
                NodeId::Bus => None,
            })
            .collect();
        self.layout = Some(layout_diagram(&graph, &LayoutParams::default()));

        if self.selected >= self.device_ids.len() {
            self.selected = self.device_ids.len().saturating_sub(1);
        }
        // A device that vanished from the fleet cannot be edited or saved.
        self.staged
            .retain(|c| self.device_ids.contains(&c.device_id));
        if let Some(edit) = &self.edit {
            if !self.device_ids.contains(&edit.device_id) {
                self.edit = None;
            }
        }
    }

    fn selected_id(&self) -> Option<i64> {
        self.device_ids.get(self.selected).copied()
    }

    fn device(&self, id: i64) -> Option<&Arc<Device>> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.devices.iter().find(|d| d.id == id))
    }

    fn device_name(&self, id: i64) -> String {
        self.device(id)
            .map_or_else(|| format!("#{id}"), |d| d.name.clone())
    }

    fn parent_label(&self, parent: Option<i64>) -> String {
        parent.map_or_else(|| "BUS".into(), |id| self.device_name(id))
    }

    /// Begin editing the selected device's parent.
    fn begin_edit(&mut self) {
        let Some(device_id) = self.selected_id() else {
            return;
        };
        let mut candidates: Vec<Option<i64>> = vec![None];
        candidates.extend(
            self.device_ids
                .iter()
                .filter(|&&id| id != device_id)
                .copied()
                .map(Some),
        );

        // Start from the currently effective parent (staged edit wins).
        let current = self
            .staged
            .iter()
            .find(|c| c.device_id == device_id)
            .map(|c| c.new_parent)
            .or_else(|| self.device(device_id).map(|d| d.parent_device_id));
        let idx = current
            .and_then(|p| candidates.iter().position(|&c| c == p))
            .unwrap_or(0);

        self.edit = Some(EditState {
            device_id,
            candidates,
            idx,
        });
    }

    /// Stage the edit-mode candidate as this device's new parent.
    fn stage_edit(&mut self) {
        let Some(edit) = self.edit.take() else {
            return;
        };
        let new_parent = edit.candidates.get(edit.idx).copied().unwrap_or(None);
        let change = ReparentChange {
            device_id: edit.device_id,
            new_parent,
        };
        if let Some(existing) = self
            .staged
            .iter_mut()
            .find(|c| c.device_id == edit.device_id)
        {
            *existing = change;
        } else {
            self.staged.push(change);
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent) -> Option<Action> {
        let edit = self.edit.as_mut()?;
        match key.code {
            KeyCode::Char('j') | KeyCode::Down | KeyCode::Char('n') => {
                edit.idx = (edit.idx + 1) % edit.candidates.len();
            }
            KeyCode::Char('k') | KeyCode::Up | KeyCode::Char('p') => {
                edit.idx = (edit.idx + edit.candidates.len() - 1) % edit.candidates.len();
            }
            KeyCode::Enter => self.stage_edit(),
            KeyCode::Esc => self.edit = None,
            _ => {}
        }
        // Consume every key while editing (Render is a no-op action).
        Some(Action::Render)
    }

    // ── Painting ─────────────────────────────────────────────────

    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    fn paint(&self, canvas: &mut Canvas, layout: &LayoutedDiagram) {
        let (dx, dy) = self.pan;

        // Edges underneath, boxes on top.
        for edge in &layout.edges {
            let (Some(parent), Some(child)) = (layout.node(edge.from), layout.node(edge.to))
            else {
                continue;
            };

            let px = parent.center_x().round() as i32 + dx;
            let py = parent.bottom().round() as i32 + dy;
            let cx = child.center_x().round() as i32 + dx;
            let cy = child.y.round() as i32 + dy;

            let style = if edge.live {
                theme::edge_live()
            } else {
                theme::edge_dead()
            };

            // Elbow route: down from the parent, across, into the child.
            let mid_y = cy - 1;
            let mut path: Vec<(i32, i32, char)> = Vec::new();
            for y in py..mid_y {
                path.push((px, y, '│'));
            }
            if px == cx {
                path.push((px, mid_y, '│'));
            } else {
                let (lo, hi) = (px.min(cx), px.max(cx));
                for x in lo..=hi {
                    let ch = if x == px {
                        if px < cx { '└' } else { '┘' }
                    } else if x == cx {
                        if px < cx { '┐' } else { '┌' }
                    } else {
                        '─'
                    };
                    path.push((x, mid_y, ch));
                }
            }

            for &(x, y, ch) in &path {
                canvas.put(x, y, ch, style);
            }

            // A pulse travels along live feeds so power flow reads at a
            // glance even on short edges.
            if edge.live && !path.is_empty() {
                let phase = (self.tick as usize) % path.len();
                let (x, y, _) = path[phase];
                canvas.put(x, y, '●', theme::edge_live().add_modifier(Modifier::BOLD));
            }
        }

        for positioned in &layout.nodes {
            let node = &positioned.node;
            let x = positioned.x.round() as i32 + dx;
            let y = positioned.y.round() as i32 + dy;
            let w = (node.width.round() as i32).max(3);
            let h = (node.height.round() as i32).max(3);

            let style = match node.id {
                NodeId::Bus => theme::bus_style(),
                NodeId::Device(id) => {
                    let online = node.device.as_ref().is_some_and(|d| d.is_online);
                    let selected = self.selected_id() == Some(id);
                    let staged = self.staged.iter().any(|c| c.device_id == id);
                    if selected {
                        Style::default().fg(theme::AMBER).add_modifier(Modifier::BOLD)
                    } else if staged {
                        theme::staged_edit()
                    } else if online {
                        theme::node_online()
                    } else {
                        theme::node_offline()
                    }
                }
            };

            // Box outline
            for col in 1..w - 1 {
                canvas.put(x + col, y, '─', style);
                canvas.put(x + col, y + h - 1, '─', style);
            }
            for row in 1..h - 1 {
                canvas.put(x, y + row, '│', style);
                canvas.put(x + w - 1, y + row, '│', style);
            }
            canvas.put(x, y, '┌', style);
            canvas.put(x + w - 1, y, '┐', style);
            canvas.put(x, y + h - 1, '└', style);
            canvas.put(x + w - 1, y + h - 1, '┘', style);

            // Centered label on the middle row
            let label: Vec<char> = node.label.chars().collect();
            let label_w = label.len() as i32;
            let start = x + ((w - label_w) / 2).max(1);
            for (i, &ch) in label.iter().enumerate() {
                canvas.put(start + i as i32, y + h / 2, ch, style);
            }
        }
    }

    fn render_canvas(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!(
                " Single-Line Diagram  ·  {} devices ",
                self.device_ids.len()
            ))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let mut inner = block.inner(area);
        frame.render_widget(block, area);

        // Fetch failures keep the last diagram visible under a banner.
        if let PollState::Error(message) = &self.poll_state {
            if inner.height > 0 {
                let banner = Rect { height: 1, ..inner };
                frame.render_widget(
                    Paragraph::new(Line::from(Span::styled(
                        format!(" backend unreachable: {message} — showing last data "),
                        theme::error_banner(),
                    ))),
                    banner,
                );
                inner.y += 1;
                inner.height -= 1;
            }
        }

        let Some(layout) = &self.layout else {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    " Waiting for first poll…",
                    Style::default().fg(theme::BORDER_GRAY),
                ))),
                inner,
            );
            return;
        };

        let mut canvas = Canvas::new(usize::from(inner.width), usize::from(inner.height));
        self.paint(&mut canvas, layout);
        frame.render_widget(Paragraph::new(canvas.into_lines()), inner);
    }

    #[allow(clippy::too_many_lines)]
    fn render_side_panel(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Details ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let label = Style::default().fg(theme::BORDER_GRAY);
        let val = Style::default().fg(theme::GRID_CYAN);
        let mut lines: Vec<Line> = Vec::new();

        if let Some(device) = self.selected_id().and_then(|id| self.device(id)) {
            let status = if device.is_online { "Online" } else { "Offline" };
            let status_color = if device.is_online {
                theme::LIVE_GREEN
            } else {
                theme::ALERT_RED
            };

            lines.push(Line::from(vec![
                Span::styled(" Device  ", label),
                Span::styled(device.name.clone(), val.add_modifier(Modifier::BOLD)),
            ]));
            lines.push(Line::from(vec![
                Span::styled(" Status  ", label),
                Span::styled(status, Style::default().fg(status_color)),
            ]));
            lines.push(Line::from(vec![
                Span::styled(" Power   ", label),
                Span::styled(device.power_label(), Style::default().fg(theme::AMBER)),
            ]));
            lines.push(Line::from(vec![
                Span::styled(" Fed by  ", label),
                Span::styled(self.parent_label(device.parent_device_id), val),
            ]));
            if let Some(location) = &device.location {
                lines.push(Line::from(vec![
                    Span::styled(" Site    ", label),
                    Span::styled(location.clone(), val),
                ]));
            }
        } else {
            lines.push(Line::from(Span::styled(
                " No device selected",
                Style::default().fg(theme::BORDER_GRAY),
            )));
        }
        lines.push(Line::from(""));

        if let Some(edit) = &self.edit {
            let candidate = edit.candidates.get(edit.idx).copied().unwrap_or(None);
            lines.push(Line::from(Span::styled(
                format!(" Reassign {} ", self.device_name(edit.device_id)),
                theme::staged_edit(),
            )));
            lines.push(Line::from(vec![
                Span::styled(" New feed ", label),
                Span::styled(self.parent_label(candidate), theme::staged_edit()),
            ]));
            lines.push(Line::from(vec![
                Span::styled(" j/k ", theme::key_hint_key()),
                Span::styled("cycle  ", theme::key_hint()),
                Span::styled("Enter ", theme::key_hint_key()),
                Span::styled("stage  ", theme::key_hint()),
                Span::styled("Esc ", theme::key_hint_key()),
                Span::styled("cancel", theme::key_hint()),
            ]));
            lines.push(Line::from(""));
        }

        lines.push(Line::from(Span::styled(
            format!(" Staged changes ({})", self.staged.len()),
            Style::default()
                .fg(theme::GRID_CYAN)
                .add_modifier(Modifier::BOLD),
        )));
        if self.staged.is_empty() {
            lines.push(Line::from(Span::styled(
                "   (none)",
                Style::default().fg(theme::BORDER_GRAY),
            )));
        } else {
            for change in &self.staged {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("  {} ", self.device_name(change.device_id)),
                        theme::table_row(),
                    ),
                    Span::styled("→ ", theme::staged_edit()),
                    Span::styled(self.parent_label(change.new_parent), theme::staged_edit()),
                ]));
            }
        }

        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(" e ", theme::key_hint_key()),
            Span::styled("edit  ", theme::key_hint()),
            Span::styled("s ", theme::key_hint_key()),
            Span::styled("save  ", theme::key_hint()),
            Span::styled("u ", theme::key_hint_key()),
            Span::styled("discard  ", theme::key_hint()),
            Span::styled("←↓↑→ ", theme::key_hint_key()),
            Span::styled("pan", theme::key_hint()),
        ]));

        frame.render_widget(Paragraph::new(lines), inner);
    }
}

impl Screen for DiagramScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.edit.is_some() {
            return Ok(self.handle_edit_key(key));
        }

        match key.code {
            KeyCode::Char('j') => {
                if !self.device_ids.is_empty() {
                    self.selected = (self.selected + 1) % self.device_ids.len();
                }
                Ok(None)
            }
            KeyCode::Char('k') => {
                if !self.device_ids.is_empty() {
                    self.selected =
                        (self.selected + self.device_ids.len() - 1) % self.device_ids.len();
                }
                Ok(None)
            }
            KeyCode::Left => {
                self.pan.0 += 4;
                Ok(None)
            }
            KeyCode::Right => {
                self.pan.0 -= 4;
                Ok(None)
            }
            KeyCode::Up => {
                self.pan.1 += 2;
                Ok(None)
            }
            KeyCode::Down => {
                self.pan.1 -= 2;
                Ok(None)
            }
            KeyCode::Char('0') => {
                self.pan = (0, 0);
                Ok(None)
            }
            KeyCode::Char('e') => {
                self.begin_edit();
                Ok(None)
            }
            KeyCode::Char('u') => {
                self.staged.clear();
                Ok(None)
            }
            KeyCode::Char('s') => {
                if self.staged.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Action::SubmitReparents(self.staged.clone())))
                }
            }
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::SnapshotUpdated(snapshot) => {
                self.snapshot = Some(Arc::clone(snapshot));
                self.rebuild();
            }
            Action::PollStateChanged(state) => {
                self.poll_state = state.clone();
            }
            Action::Tick => {
                self.tick = self.tick.wrapping_add(1);
            }
            Action::ReparentsSaved(report) => {
                // Successful changes are now backend truth; failures stay
                // staged so the operator can retry or discard.
                self.staged.retain(|change| {
                    report
                        .failures()
                        .any(|f| f.device_id == change.device_id)
                });
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let chunks =
            Layout::horizontal([Constraint::Percentage(68), Constraint::Percentage(32)])
                .split(area);
        self.render_canvas(frame, chunks[0]);
        self.render_side_panel(frame, chunks[1]);
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
    use crossterm::event::{KeyCode, KeyModifiers};

    fn snapshot(devices: Vec<Device>) -> Arc<PowerSnapshot> {
        Arc::new(PowerSnapshot {
            devices: Arc::new(devices.into_iter().map(Arc::new).collect()),
            timestamp: Utc::now(),
        })
    }

    fn device(id: i64, parent: Option<i64>) -> Device {
        Device {
            id,
            name: format!("D{id}"),
            location: None,
            power_value: Some(5.0),
            unit: Some("kW".into()),
            is_online: true,
            parent_device_id: parent,
            parent_device_name: None,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn screen_with_devices() -> DiagramScreen {
        let mut screen = DiagramScreen::new();
        let action = Action::SnapshotUpdated(snapshot(vec![
            device(1, None),
            device(2, Some(1)),
            device(3, None),
        ]));
        screen.update(&action).unwrap();
        screen
    }

    #[test]
    fn snapshot_rebuilds_layout_and_selection() {
        let screen = screen_with_devices();
        assert_eq!(screen.device_ids, vec![1, 2, 3]);
        assert!(screen.layout.is_some());
    }

    #[test]
    fn staging_an_edit_records_the_change() {
        let mut screen = screen_with_devices();

        // Select device 2, open the editor, pick the bus, stage it.
        screen.handle_key_event(key(KeyCode::Char('j'))).unwrap();
        assert_eq!(screen.selected_id(), Some(2));

        screen.handle_key_event(key(KeyCode::Char('e'))).unwrap();
        assert!(screen.edit.is_some());

        screen.handle_key_event(key(KeyCode::Char('k'))).unwrap();
        screen.handle_key_event(key(KeyCode::Enter)).unwrap();

        assert!(screen.edit.is_none());
        assert_eq!(screen.staged.len(), 1);
        assert_eq!(screen.staged[0].device_id, 2);
    }

    #[test]
    fn escape_cancels_edit_without_staging() {
        let mut screen = screen_with_devices();
        screen.handle_key_event(key(KeyCode::Char('e'))).unwrap();
        let consumed = screen.handle_key_event(key(KeyCode::Esc)).unwrap();

        assert!(consumed.is_some(), "Esc must be consumed in edit mode");
        assert!(screen.edit.is_none());
        assert!(screen.staged.is_empty());
    }

    #[test]
    fn save_emits_staged_changes() {
        let mut screen = screen_with_devices();
        screen.staged.push(ReparentChange {
            device_id: 2,
            new_parent: None,
        });

        let action = screen.handle_key_event(key(KeyCode::Char('s'))).unwrap();
        match action {
            Some(Action::SubmitReparents(changes)) => {
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].device_id, 2);
            }
            other => panic!("expected SubmitReparents, got {other:?}"),
        }
    }

    #[test]
    fn failed_changes_stay_staged_after_save() {
        use wattline_core::{BatchReparentReport, ReparentOutcome};

        let mut screen = screen_with_devices();
        screen.staged = vec![
            ReparentChange {
                device_id: 2,
                new_parent: None,
            },
            ReparentChange {
                device_id: 3,
                new_parent: Some(1),
            },
        ];

        let report = BatchReparentReport {
            outcomes: vec![
                ReparentOutcome {
                    device_id: 2,
                    error: None,
                },
                ReparentOutcome {
                    device_id: 3,
                    error: Some("would create a cycle".into()),
                },
            ],
        };
        screen
            .update(&Action::ReparentsSaved(Arc::new(report)))
            .unwrap();

        assert_eq!(screen.staged.len(), 1);
        assert_eq!(screen.staged[0].device_id, 3);
    }

    #[test]
    fn error_state_keeps_last_layout() {
        let mut screen = screen_with_devices();
        screen
            .update(&Action::PollStateChanged(PollState::Error(
                "connection refused".into(),
            )))
            .unwrap();

        assert!(screen.layout.is_some(), "stale diagram must survive errors");
    }

    #[test]
    fn canvas_clips_out_of_bounds_writes() {
        let mut canvas = Canvas::new(4, 2);
        canvas.put(-1, 0, 'x', Style::default());
        canvas.put(0, 5, 'x', Style::default());
        canvas.put(1, 1, 'y', Style::default());

        let lines = canvas.into_lines();
        assert_eq!(lines.len(), 2);
    }
}
