// ── Polling loop ──
//
// Fetches the realtime-power snapshot on a fixed cadence and applies the
// result to the SnapshotStore. Exactly one fetch is ever in flight: the
// fetch is awaited inline inside the loop, so a slow backend delays the
// next tick instead of stacking requests. Missed ticks are skipped, not
// replayed in a burst.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use wattline_api::EnergyClient;

use crate::model::PowerSnapshot;
use crate::store::SnapshotStore;

/// Run the poll loop until `cancel` fires.
///
/// `refresh_rx` carries on-demand refresh requests (e.g. right after a
/// hierarchy edit); a request behaves like an immediate tick.
pub(crate) async fn poll_task(
    client: Arc<EnergyClient>,
    store: Arc<SnapshotStore>,
    poll_interval: Duration,
    cancel: CancellationToken,
    mut refresh_rx: mpsc::Receiver<()>,
) {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
            req = refresh_rx.recv() => {
                if req.is_none() {
                    break;
                }
                // An explicit refresh restarts the cadence so the next
                // periodic fetch lands a full interval later.
                interval.reset();
            }
        }

        store.begin_refresh();

        // Shutdown must not wait out a slow request.
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = client.realtime_power() => result,
        };

        match result {
            Ok(resp) => {
                if resp.devices.is_empty() {
                    warn!("realtime-power returned no devices");
                }
                let snapshot = PowerSnapshot::from_response(resp);
                debug!(devices = snapshot.devices.len(), "poll cycle complete");
                store.apply(snapshot);
            }
            Err(e) => {
                warn!(error = %e, "poll cycle failed");
                store.fail(e.to_string());
            }
        }
    }

    debug!("poll task stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::store::PollState;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn start_server(body: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/realtime-power"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    fn client_for(server: &MockServer) -> Arc<EnergyClient> {
        let config = MonitorConfig::new(Url::parse(&server.uri()).unwrap());
        Arc::new(EnergyClient::new(config.url.clone(), &config.transport()).unwrap())
    }

    #[tokio::test]
    async fn first_poll_populates_the_store() {
        let server = start_server(serde_json::json!({
            "devices": [
                { "id": 1, "name": "Main Feeder", "is_online": true }
            ],
            "timestamp": "2026-01-05T10:00:00Z"
        }))
        .await;

        let store = Arc::new(SnapshotStore::new());
        let cancel = CancellationToken::new();
        let (_tx, rx) = mpsc::channel(4);
        let mut snapshots = store.subscribe_snapshots();

        let handle = tokio::spawn(poll_task(
            client_for(&server),
            Arc::clone(&store),
            Duration::from_millis(10),
            cancel.clone(),
            rx,
        ));

        snapshots.changed().await.unwrap();
        let snap = store.snapshot().unwrap();
        assert_eq!(snap.devices.len(), 1);
        assert_eq!(store.state(), PollState::Displaying);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn fetch_failure_sets_error_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/realtime-power"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = Arc::new(SnapshotStore::new());
        let cancel = CancellationToken::new();
        let (_tx, rx) = mpsc::channel(4);
        let mut states = store.subscribe_state();

        let handle = tokio::spawn(poll_task(
            client_for(&server),
            Arc::clone(&store),
            Duration::from_millis(10),
            cancel.clone(),
            rx,
        ));

        loop {
            states.changed().await.unwrap();
            let state = states.borrow_and_update().clone();
            if let PollState::Error(_) = state {
                break;
            }
        }

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn manual_refresh_triggers_an_immediate_fetch() {
        let server = start_server(serde_json::json!({ "devices": [] })).await;

        let store = Arc::new(SnapshotStore::new());
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(4);
        let mut snapshots = store.subscribe_snapshots();

        let handle = tokio::spawn(poll_task(
            client_for(&server),
            Arc::clone(&store),
            // Long enough that only an explicit refresh can fetch.
            Duration::from_secs(3600),
            cancel.clone(),
            rx,
        ));

        // Consume the immediate first tick's snapshot.
        snapshots.changed().await.unwrap();

        tx.send(()).await.unwrap();
        snapshots.changed().await.unwrap();

        cancel.cancel();
        handle.await.unwrap();
    }
}
