// Wire types for the energy-monitoring backend.
//
// These deserialize the backend's JSON verbatim. Domain conversions live
// in `wattline-core` -- this module stays a faithful mirror of the wire.

use serde::{Deserialize, Serialize};

/// A monitored electrical device as reported by the backend.
///
/// `parent_device_id` is the operator-declared supply hierarchy: the id of
/// the device feeding this one, or `None` for devices fed directly from
/// the main bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Instantaneous power draw. `None` when the meter has not reported.
    #[serde(default)]
    pub power_value: Option<f64>,
    /// Unit for `power_value` (e.g. "kW").
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub parent_device_id: Option<i64>,
    #[serde(default)]
    pub parent_device_name: Option<String>,
}

/// Response of the realtime power endpoint.
///
/// A missing `devices` field deserializes as an empty list -- the backend
/// occasionally omits it on internal errors, and the view degrades to an
/// empty diagram rather than failing the whole poll.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RealtimePowerResponse {
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Backend-reported error string. Treated as a failed poll when set.
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of the per-device "set parent" endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SetParentRequest {
    pub parent_device_id: Option<i64>,
}

/// Error payload shape the backend uses on failed requests.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(default)]
    pub error: Option<String>,
}
