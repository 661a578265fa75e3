// ── Monitor configuration ──

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use wattline_api::{TlsMode, TransportConfig};

/// Default realtime poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// TLS verification policy (core-level mirror of the api crate's `TlsMode`).
#[derive(Debug, Clone, Default)]
pub enum TlsVerification {
    #[default]
    System,
    CustomCa(PathBuf),
    DangerAcceptInvalid,
}

/// Configuration for a [`Monitor`](crate::Monitor).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Backend base URL (e.g. `http://emon.plant.local:8080`).
    pub url: Url,
    /// Realtime poll cadence.
    pub poll_interval: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    /// TLS verification policy.
    pub tls: TlsVerification,
}

impl MonitorConfig {
    /// Config with default cadence and timeout for the given backend URL.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            tls: TlsVerification::default(),
        }
    }

    /// Translate into the api crate's transport settings.
    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::System => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
