// ── Device domain types ──

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wattline_api::{DeviceRecord, RealtimePowerResponse};

/// A monitored electrical meter/point: power draw, online status, and its
/// position in the operator-declared supply hierarchy.
///
/// Immutable within a single refresh cycle; every poll replaces the whole
/// fleet snapshot rather than mutating individual devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    /// Instantaneous power draw. `None` when the meter has not reported.
    pub power_value: Option<f64>,
    /// Unit for `power_value` (e.g. "kW").
    pub unit: Option<String>,
    pub is_online: bool,
    /// Id of the feeding device, or `None` for bus-fed devices.
    pub parent_device_id: Option<i64>,
    pub parent_device_name: Option<String>,
}

impl Device {
    /// Human-readable power reading, e.g. `412.5 kW`, or `--` when the
    /// meter has not reported.
    pub fn power_label(&self) -> String {
        match self.power_value {
            Some(v) => match self.unit.as_deref() {
                Some(unit) => format!("{v:.1} {unit}"),
                None => format!("{v:.1}"),
            },
            None => "--".into(),
        }
    }

    /// Whether this device is fed directly from the main bus.
    pub fn is_bus_fed(&self) -> bool {
        self.parent_device_id.is_none()
    }
}

impl From<DeviceRecord> for Device {
    fn from(r: DeviceRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            location: r.location,
            power_value: r.power_value,
            unit: r.unit,
            is_online: r.is_online,
            parent_device_id: r.parent_device_id,
            parent_device_name: r.parent_device_name,
        }
    }
}

/// One poll cycle's worth of realtime data. Pure input to the diagram
/// builder -- the derived graph is never stored, only this is.
#[derive(Debug, Clone)]
pub struct PowerSnapshot {
    pub devices: Arc<Vec<Arc<Device>>>,
    /// Backend-reported timestamp, or receive time if absent/unparsable.
    pub timestamp: DateTime<Utc>,
}

impl PowerSnapshot {
    /// Convert a wire response into a snapshot.
    pub fn from_response(resp: RealtimePowerResponse) -> Self {
        let timestamp = resp
            .timestamp
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map_or_else(Utc::now, |t| t.with_timezone(&Utc));

        let devices = resp
            .devices
            .into_iter()
            .map(|r| Arc::new(Device::from(r)))
            .collect();

        Self {
            devices: Arc::new(devices),
            timestamp,
        }
    }

    /// Total measured power across reporting devices, in the unit the
    /// backend reports (mixed units are summed as-is -- aggregation is a
    /// backend concern, this is display-only).
    pub fn total_power(&self) -> f64 {
        self.devices.iter().filter_map(|d| d.power_value).sum()
    }

    /// Count of online devices.
    pub fn online_count(&self) -> usize {
        self.devices.iter().filter(|d| d.is_online).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64) -> DeviceRecord {
        DeviceRecord {
            id,
            name: format!("Feeder {id}"),
            location: None,
            power_value: Some(10.0),
            unit: Some("kW".into()),
            is_online: true,
            parent_device_id: None,
            parent_device_name: None,
        }
    }

    #[test]
    fn power_label_with_unit() {
        let d = Device::from(record(1));
        assert_eq!(d.power_label(), "10.0 kW");
    }

    #[test]
    fn power_label_missing_value() {
        let mut r = record(1);
        r.power_value = None;
        assert_eq!(Device::from(r).power_label(), "--");
    }

    #[test]
    fn snapshot_parses_backend_timestamp() {
        let resp = RealtimePowerResponse {
            devices: vec![record(1), record(2)],
            timestamp: Some("2026-03-14T08:21:05Z".into()),
            error: None,
        };
        let snap = PowerSnapshot::from_response(resp);
        assert_eq!(snap.devices.len(), 2);
        assert_eq!(snap.timestamp.to_rfc3339(), "2026-03-14T08:21:05+00:00");
        assert!((snap.total_power() - 20.0).abs() < f64::EPSILON);
        assert_eq!(snap.online_count(), 2);
    }

    #[test]
    fn snapshot_falls_back_to_now_on_bad_timestamp() {
        let resp = RealtimePowerResponse {
            devices: vec![],
            timestamp: Some("yesterday-ish".into()),
            error: None,
        };
        let before = Utc::now();
        let snap = PowerSnapshot::from_response(resp);
        assert!(snap.timestamp >= before);
    }
}
