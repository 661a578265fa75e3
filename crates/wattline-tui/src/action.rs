//! All possible UI actions. Actions are the sole mechanism for state mutation.

use std::sync::Arc;

use wattline_core::{
    BatchReparentReport, Device, PollState, PowerSnapshot, ReparentChange, ReparentOutcome,
};

use crate::screen::ScreenId;

/// Notification severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A toast notification shown in the status bar.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Info,
        }
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Warning,
        }
    }

    /// Toast for a finished save batch: success when everything went
    /// through, warning when only some changes did, error otherwise.
    pub fn for_save_report(report: &BatchReparentReport) -> Self {
        if report.all_succeeded() {
            Self::success(report.summary())
        } else if report.outcomes.iter().any(ReparentOutcome::succeeded) {
            Self::warning(report.summary())
        } else {
            Self::error(report.summary())
        }
    }
}

/// Every state transition in the TUI is expressed as an Action.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Navigation ────────────────────────────────────────────────
    SwitchScreen(ScreenId),
    GoBack,

    // ── Data Events (from the monitor) ────────────────────────────
    SnapshotUpdated(Arc<PowerSnapshot>),
    PollStateChanged(PollState),
    /// Device roster fetched from the configuration endpoint; fills the
    /// device table before the first realtime poll lands.
    DevicesLoaded(Arc<Vec<Arc<Device>>>),

    // ── Monitor Commands ──────────────────────────────────────────
    /// Request an out-of-cadence poll.
    RefreshNow,
    /// Submit staged hierarchy edits to the backend.
    SubmitReparents(Vec<ReparentChange>),
    /// Itemized result of a submitted batch.
    ReparentsSaved(Arc<BatchReparentReport>),

    // ── Help / Notifications ──────────────────────────────────────
    ToggleHelp,
    Notify(Notification),
    DismissNotification,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(errors: &[Option<&str>]) -> BatchReparentReport {
        BatchReparentReport {
            outcomes: errors
                .iter()
                .enumerate()
                .map(|(i, e)| ReparentOutcome {
                    device_id: i64::try_from(i).unwrap_or(0) + 1,
                    error: e.map(String::from),
                })
                .collect(),
        }
    }

    #[test]
    fn save_toast_level_tracks_outcomes() {
        let all_ok = Notification::for_save_report(&report(&[None, None]));
        assert_eq!(all_ok.level, NotificationLevel::Success);

        let partial = Notification::for_save_report(&report(&[None, Some("rejected")]));
        assert_eq!(partial.level, NotificationLevel::Warning);
        assert_eq!(partial.message, "saved 1 of 2 changes");

        let none = Notification::for_save_report(&report(&[Some("rejected")]));
        assert_eq!(none.level, NotificationLevel::Error);
    }
}
