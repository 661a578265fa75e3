// ── Reactive snapshot store ──
//
// Holds the latest realtime-power snapshot and the poll state machine.
// Mutations are broadcast to subscribers via `watch` channels; consumers
// either read the current value or subscribe for change notifications.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::PowerSnapshot;

/// Observable lifecycle of the polling loop.
///
/// `Loading` only ever occurs before the first successful fetch. Once
/// data has arrived, a fetch in progress is `Refreshing` and a fetch
/// failure is `Error` -- in both cases the last good snapshot stays
/// available for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// No data yet, first fetch pending or in flight.
    Loading,
    /// Last fetch succeeded, nothing in flight.
    Displaying,
    /// A fetch is in flight but previous data is still shown.
    Refreshing,
    /// Last fetch failed. The message is operator-facing.
    Error(String),
}

impl PollState {
    /// True while a fetch is in flight.
    pub fn is_fetching(&self) -> bool {
        matches!(self, Self::Loading | Self::Refreshing)
    }
}

/// Central store for poll results.
///
/// Cheap to share behind an `Arc`; the snapshot itself is an
/// `Arc<PowerSnapshot>` so subscribers clone a pointer, never the data.
pub struct SnapshotStore {
    snapshot: watch::Sender<Option<Arc<PowerSnapshot>>>,
    state: watch::Sender<PollState>,
    last_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(None);
        let (state, _) = watch::channel(PollState::Loading);
        let (last_refresh, _) = watch::channel(None);

        Self {
            snapshot,
            state,
            last_refresh,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Latest snapshot, or `None` before the first successful fetch.
    pub fn snapshot(&self) -> Option<Arc<PowerSnapshot>> {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// When the last successful fetch completed.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.borrow()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_snapshots(&self) -> watch::Receiver<Option<Arc<PowerSnapshot>>> {
        self.snapshot.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    // ── Mutations (poll task only) ───────────────────────────────────

    /// Mark a fetch as started: `Loading` before any data has arrived,
    /// `Refreshing` once a snapshot exists.
    pub(crate) fn begin_refresh(&self) {
        let next = if self.snapshot.borrow().is_some() {
            PollState::Refreshing
        } else {
            PollState::Loading
        };
        let _ = self.state.send(next);
    }

    /// Apply a successful fetch: replace the snapshot wholesale and
    /// clear any error state.
    pub(crate) fn apply(&self, snapshot: PowerSnapshot) {
        let _ = self.snapshot.send(Some(Arc::new(snapshot)));
        let _ = self.last_refresh.send(Some(Utc::now()));
        let _ = self.state.send(PollState::Displaying);
    }

    /// Record a failed fetch. The previous snapshot is left untouched so
    /// consumers keep rendering stale data alongside the error.
    pub(crate) fn fail(&self, message: String) {
        let _ = self.state.send(PollState::Error(message));
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wattline_api::RealtimePowerResponse;

    fn snapshot() -> PowerSnapshot {
        PowerSnapshot::from_response(RealtimePowerResponse {
            devices: vec![],
            timestamp: None,
            error: None,
        })
    }

    #[test]
    fn starts_loading_with_no_data() {
        let store = SnapshotStore::new();
        assert!(store.snapshot().is_none());
        assert_eq!(store.state(), PollState::Loading);
        assert!(store.last_refresh().is_none());
    }

    #[test]
    fn begin_refresh_stays_loading_before_first_data() {
        let store = SnapshotStore::new();
        store.begin_refresh();
        assert_eq!(store.state(), PollState::Loading);
    }

    #[test]
    fn begin_refresh_after_data_is_refreshing() {
        let store = SnapshotStore::new();
        store.apply(snapshot());
        store.begin_refresh();
        assert_eq!(store.state(), PollState::Refreshing);
        assert!(store.snapshot().is_some());
    }

    #[test]
    fn failure_keeps_stale_snapshot() {
        let store = SnapshotStore::new();
        store.apply(snapshot());
        store.fail("connection refused".into());

        assert_eq!(store.state(), PollState::Error("connection refused".into()));
        assert!(store.snapshot().is_some(), "stale data must survive errors");
    }

    #[test]
    fn success_after_failure_recovers() {
        let store = SnapshotStore::new();
        store.apply(snapshot());
        store.fail("boom".into());
        store.begin_refresh();
        store.apply(snapshot());

        assert_eq!(store.state(), PollState::Displaying);
        assert!(store.last_refresh().is_some());
    }

    #[tokio::test]
    async fn subscribers_see_state_changes() {
        let store = SnapshotStore::new();
        let mut rx = store.subscribe_state();

        store.apply(snapshot());
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), PollState::Displaying);
    }
}
