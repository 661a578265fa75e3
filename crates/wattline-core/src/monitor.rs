// ── Monitor abstraction ──
//
// Full lifecycle management for an energy-backend connection. Owns the
// HTTP client, the polling loop, and the reactive SnapshotStore, and
// routes hierarchy edits to the backend.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wattline_api::EnergyClient;

use crate::config::MonitorConfig;
use crate::error::CoreError;
use crate::model::{Device, PowerSnapshot};
use crate::poller::poll_task;
use crate::store::{PollState, SnapshotStore};

const REFRESH_CHANNEL_SIZE: usize = 8;

// ── Hierarchy edits ──────────────────────────────────────────────

/// One staged parent reassignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReparentChange {
    pub device_id: i64,
    /// `None` attaches the device directly to the main bus.
    pub new_parent: Option<i64>,
}

/// Result of one reassignment within a batch.
#[derive(Debug, Clone)]
pub struct ReparentOutcome {
    pub device_id: i64,
    /// `None` on success, otherwise an operator-facing message.
    pub error: Option<String>,
}

impl ReparentOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Itemized report for a batch of reassignments.
///
/// Changes are independent: a failure never rolls back the ones that
/// succeeded, it is reported per device instead.
#[derive(Debug, Clone)]
pub struct BatchReparentReport {
    pub outcomes: Vec<ReparentOutcome>,
}

impl BatchReparentReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(ReparentOutcome::succeeded)
    }

    /// The failed outcomes, in submission order.
    pub fn failures(&self) -> impl Iterator<Item = &ReparentOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    /// One-line summary for status bars, e.g. `saved 2 of 3 changes`.
    pub fn summary(&self) -> String {
        let total = self.outcomes.len();
        let ok = self.outcomes.iter().filter(|o| o.succeeded()).count();
        if ok == total {
            format!("saved {total} change{}", if total == 1 { "" } else { "s" })
        } else {
            format!("saved {ok} of {total} changes")
        }
    }
}

// ── Monitor ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. Construction builds the
/// HTTP client but performs no I/O; call [`start()`](Self::start) to
/// begin polling.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    client: Arc<EnergyClient>,
    store: Arc<SnapshotStore>,
    cancel: CancellationToken,
    refresh_tx: mpsc::Sender<()>,
    refresh_rx: Mutex<Option<mpsc::Receiver<()>>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Monitor {
    /// Create a new Monitor from configuration. Does NOT poll -- call
    /// [`start()`](Self::start) to spawn the background loop.
    pub fn new(config: MonitorConfig) -> Result<Self, CoreError> {
        if config.poll_interval.is_zero() {
            return Err(CoreError::InvalidConfig(
                "poll interval must be non-zero".into(),
            ));
        }
        let client = EnergyClient::new(config.url.clone(), &config.transport())?;
        let store = Arc::new(SnapshotStore::new());
        let (refresh_tx, refresh_rx) = mpsc::channel(REFRESH_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(MonitorInner {
                config,
                client: Arc::new(client),
                store,
                cancel: CancellationToken::new(),
                refresh_tx,
                refresh_rx: Mutex::new(Some(refresh_rx)),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Access the monitor configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Access the underlying SnapshotStore.
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the polling loop. The first fetch fires immediately, then
    /// on the configured cadence. Calling twice is a no-op.
    pub async fn start(&self) {
        let Some(rx) = self.inner.refresh_rx.lock().await.take() else {
            debug!("poll loop already started");
            return;
        };

        let handle = tokio::spawn(poll_task(
            Arc::clone(&self.inner.client),
            Arc::clone(&self.inner.store),
            self.inner.config.poll_interval,
            self.inner.cancel.clone(),
            rx,
        ));
        self.inner.task_handles.lock().await.push(handle);
        info!(
            url = %self.inner.config.url,
            interval = ?self.inner.config.poll_interval,
            "monitor started"
        );
    }

    /// Stop polling: cancel and join background tasks. An in-flight
    /// fetch is abandoned rather than awaited.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("monitor stopped");
    }

    /// Request an out-of-cadence poll (e.g. right after an edit). Cheap
    /// and non-blocking; collapses into the in-flight fetch if one is
    /// already running.
    pub fn refresh_now(&self) {
        let _ = self.inner.refresh_tx.try_send(());
    }

    // ── State observation ────────────────────────────────────────

    /// Latest snapshot, or `None` before the first successful fetch.
    pub fn snapshot(&self) -> Option<Arc<PowerSnapshot>> {
        self.inner.store.snapshot()
    }

    pub fn poll_state(&self) -> PollState {
        self.inner.store.state()
    }

    pub fn subscribe_snapshots(&self) -> watch::Receiver<Option<Arc<PowerSnapshot>>> {
        self.inner.store.subscribe_snapshots()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PollState> {
        self.inner.store.subscribe_state()
    }

    // ── Backend operations ───────────────────────────────────────

    /// Fetch the configuration view of the fleet (no realtime readings
    /// guarantee, used by list screens).
    pub async fn list_devices(&self) -> Result<Vec<Arc<Device>>, CoreError> {
        let records = self.inner.client.list_devices().await?;
        Ok(records
            .into_iter()
            .map(|r| Arc::new(Device::from(r)))
            .collect())
    }

    /// Apply a batch of parent reassignments.
    ///
    /// All changes are submitted concurrently, one request per device.
    /// The report is itemized in submission order; partial failure is
    /// normal and leaves the successful changes in place. Any success
    /// triggers an immediate poll so the diagram reflects the new
    /// hierarchy without waiting for the next cadence tick.
    pub async fn reparent_batch(&self, changes: &[ReparentChange]) -> BatchReparentReport {
        let futures = changes.iter().map(|change| {
            let client = Arc::clone(&self.inner.client);
            let change = *change;
            async move {
                let error = client
                    .set_parent_device(change.device_id, change.new_parent)
                    .await
                    .err()
                    .map(|e| e.to_string());
                ReparentOutcome {
                    device_id: change.device_id,
                    error,
                }
            }
        });
        let outcomes = join_all(futures).await;

        let report = BatchReparentReport { outcomes };
        if report.all_succeeded() {
            debug!(count = report.outcomes.len(), "reparent batch saved");
        } else {
            for failure in report.failures() {
                warn!(
                    device = failure.device_id,
                    error = failure.error.as_deref().unwrap_or("unknown"),
                    "reparent failed"
                );
            }
        }

        if report.outcomes.iter().any(ReparentOutcome::succeeded) {
            self.refresh_now();
        }
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use url::Url;

    use super::*;

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut config = MonitorConfig::new(Url::parse("http://emon.plant.local:8080").unwrap());
        config.poll_interval = Duration::ZERO;

        assert!(matches!(
            Monitor::new(config),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn report_summary_counts() {
        let report = BatchReparentReport {
            outcomes: vec![
                ReparentOutcome {
                    device_id: 1,
                    error: None,
                },
                ReparentOutcome {
                    device_id: 2,
                    error: Some("device not found".into()),
                },
                ReparentOutcome {
                    device_id: 3,
                    error: None,
                },
            ],
        };

        assert!(!report.all_succeeded());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.summary(), "saved 2 of 3 changes");
    }

    #[test]
    fn report_summary_singular() {
        let report = BatchReparentReport {
            outcomes: vec![ReparentOutcome {
                device_id: 7,
                error: None,
            }],
        };
        assert!(report.all_succeeded());
        assert_eq!(report.summary(), "saved 1 change");
    }
}
