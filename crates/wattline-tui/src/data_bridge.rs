//! Data bridge — connects [`Monitor`] watch channels to TUI actions.
//!
//! Runs as a background task: starts the polling loop, then forwards every
//! snapshot and poll-state change as an [`Action`] through the TUI's action
//! channel. Shuts down cleanly on cancellation.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use wattline_core::Monitor;

use crate::action::Action;

/// Spawn the data bridge connecting [`Monitor`] reactive channels to the TUI.
pub async fn spawn_data_bridge(
    monitor: Monitor,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut snapshots = monitor.subscribe_snapshots();
    let mut states = monitor.subscribe_state();

    monitor.start().await;

    // Push the current values so screens have data immediately if the
    // monitor was already polling before the bridge attached.
    if let Some(snapshot) = monitor.snapshot() {
        let _ = action_tx.send(Action::SnapshotUpdated(snapshot));
    }
    let _ = action_tx.send(Action::PollStateChanged(monitor.poll_state()));

    // Stream loop — forward every change until cancelled
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Ok(()) = snapshots.changed() => {
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    let _ = action_tx.send(Action::SnapshotUpdated(snapshot));
                }
            }

            Ok(()) = states.changed() => {
                let state = states.borrow_and_update().clone();
                let _ = action_tx.send(Action::PollStateChanged(state));
            }
        }
    }

    monitor.stop().await;
    debug!("data bridge shut down");
}
