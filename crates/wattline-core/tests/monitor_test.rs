// Integration tests for the Monitor facade against a mock backend.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wattline_core::{Monitor, MonitorConfig, PollState, ReparentChange};

fn config_for(server: &MockServer, interval: Duration) -> MonitorConfig {
    let mut config = MonitorConfig::new(Url::parse(&server.uri()).unwrap());
    config.poll_interval = interval;
    config
}

fn realtime_body(devices: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "devices": devices,
        "timestamp": "2026-02-10T09:30:00Z"
    })
}

async fn mount_realtime(server: &MockServer, devices: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/realtime-power"))
        .respond_with(ResponseTemplate::new(200).set_body_json(realtime_body(devices)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn poll_loop_delivers_snapshots() {
    let server = MockServer::start().await;
    mount_realtime(
        &server,
        serde_json::json!([
            { "id": 1, "name": "Main Feeder", "power_value": 120.0, "unit": "kW", "is_online": true },
            { "id": 2, "name": "Press Line", "power_value": 45.5, "unit": "kW",
              "is_online": true, "parent_device_id": 1 }
        ]),
    )
    .await;

    let monitor = Monitor::new(config_for(&server, Duration::from_millis(20))).unwrap();
    let mut snapshots = monitor.subscribe_snapshots();
    monitor.start().await;

    snapshots.changed().await.unwrap();
    let snap = monitor.snapshot().unwrap();
    assert_eq!(snap.devices.len(), 2);
    assert_eq!(snap.online_count(), 2);
    assert_eq!(monitor.poll_state(), PollState::Displaying);

    monitor.stop().await;
}

#[tokio::test]
async fn error_then_recovery_keeps_stale_data() {
    let server = MockServer::start().await;
    // First poll succeeds, everything after fails.
    Mock::given(method("GET"))
        .and(path("/api/realtime-power"))
        .respond_with(ResponseTemplate::new(200).set_body_json(realtime_body(
            serde_json::json!([{ "id": 1, "name": "Main Feeder", "is_online": true }]),
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/realtime-power"))
        .respond_with(
            ResponseTemplate::new(502)
                .set_body_json(serde_json::json!({ "error": "upstream timeout" })),
        )
        .mount(&server)
        .await;

    let monitor = Monitor::new(config_for(&server, Duration::from_millis(20))).unwrap();
    let mut states = monitor.subscribe_state();
    monitor.start().await;

    loop {
        states.changed().await.unwrap();
        let state = states.borrow_and_update().clone();
        if let PollState::Error(message) = state {
            assert!(message.contains("upstream timeout"), "got: {message}");
            break;
        }
    }

    // The last good snapshot survives the failure.
    let snap = monitor.snapshot().unwrap();
    assert_eq!(snap.devices.len(), 1);

    monitor.stop().await;
}

#[tokio::test]
async fn reparent_batch_reports_partial_failure_without_rollback() {
    let server = MockServer::start().await;
    mount_realtime(&server, serde_json::json!([])).await;

    // Devices 1 and 3 accept the new parent, device 2 is rejected.
    Mock::given(method("POST"))
        .and(path("/api/devices/1/parent"))
        .and(body_json(serde_json::json!({ "parent_device_id": 10 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 1, "name": "Main Feeder", "is_online": true, "parent_device_id": 10
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/devices/2/parent"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(serde_json::json!({ "error": "would create a cycle" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/devices/3/parent"))
        .and(body_json(serde_json::json!({ "parent_device_id": null })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 3, "name": "Aux Pump", "is_online": true
        })))
        .mount(&server)
        .await;

    let monitor = Monitor::new(config_for(&server, Duration::from_secs(3600))).unwrap();
    monitor.start().await;

    let report = monitor
        .reparent_batch(&[
            ReparentChange {
                device_id: 1,
                new_parent: Some(10),
            },
            ReparentChange {
                device_id: 2,
                new_parent: Some(1),
            },
            ReparentChange {
                device_id: 3,
                new_parent: None,
            },
        ])
        .await;

    assert!(!report.all_succeeded());
    assert_eq!(report.outcomes.len(), 3);
    assert!(report.outcomes[0].succeeded());
    assert!(report.outcomes[2].succeeded());

    let failed: Vec<i64> = report.failures().map(|o| o.device_id).collect();
    assert_eq!(failed, vec![2]);
    assert!(
        report.outcomes[1]
            .error
            .as_deref()
            .unwrap()
            .contains("would create a cycle")
    );
    assert_eq!(report.summary(), "saved 2 of 3 changes");

    monitor.stop().await;
}

#[tokio::test]
async fn device_roster_maps_wire_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": 1, "name": "Main Feeder", "is_online": true, "unit": "kW" },
            { "id": 2, "name": "Press Line", "is_online": false,
              "parent_device_id": 1, "parent_device_name": "Main Feeder" }
        ])))
        .mount(&server)
        .await;

    let monitor = Monitor::new(config_for(&server, Duration::from_secs(3600))).unwrap();
    let devices = monitor.list_devices().await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].id, 1);
    assert_eq!(devices[0].name, "Main Feeder");
    assert!(devices[0].power_value.is_none());
    assert_eq!(devices[1].parent_device_id, Some(1));
    assert_eq!(devices[1].parent_device_name.as_deref(), Some("Main Feeder"));
    assert!(!devices[1].is_online);
}

#[tokio::test]
async fn empty_device_list_is_served_not_treated_as_error() {
    let server = MockServer::start().await;
    mount_realtime(&server, serde_json::json!([])).await;

    let monitor = Monitor::new(config_for(&server, Duration::from_millis(20))).unwrap();
    let mut snapshots = monitor.subscribe_snapshots();
    monitor.start().await;

    snapshots.changed().await.unwrap();
    let snap = monitor.snapshot().unwrap();
    assert!(snap.devices.is_empty());
    assert_eq!(monitor.poll_state(), PollState::Displaying);

    monitor.stop().await;
}
