//! Human-readable power and data-age formatting helpers.

use chrono::{DateTime, Utc};

/// Format a power reading with its unit, e.g. "412.5 kW". Values of a
/// thousand or more in kW-family units roll up (e.g. "1.21 MW").
pub fn fmt_power(value: f64, unit: Option<&str>) -> String {
    match unit {
        Some("kW") if value.abs() >= 1000.0 => format!("{:.2} MW", value / 1000.0),
        Some("W") if value.abs() >= 1000.0 => format!("{:.2} kW", value / 1000.0),
        Some(unit) => format!("{value:.1} {unit}"),
        None => format!("{value:.1}"),
    }
}

/// Compact age of a snapshot, e.g. "2s ago", "3m ago".
pub fn fmt_age(timestamp: DateTime<Utc>) -> String {
    let secs = (Utc::now() - timestamp).num_seconds().max(0);
    if secs < 60 {
        format!("{secs}s ago")
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
