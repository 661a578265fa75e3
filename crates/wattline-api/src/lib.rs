//! Async client for the wattline energy-monitoring backend.
//!
//! The backend exposes a small REST surface:
//!
//! - `GET /api/realtime-power` — the full device fleet with instantaneous
//!   power draw, online status, and declared supply parents. Polled.
//! - `GET /api/devices` — the same fleet as plain configuration records.
//! - `POST /api/devices/{id}/parent` — reassign one device's supply parent.
//!
//! [`EnergyClient`] wraps these with typed requests/responses and a single
//! [`Error`] taxonomy. Transport concerns (TLS, timeout) are configured via
//! [`TransportConfig`].

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::EnergyClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use types::{DeviceRecord, RealtimePowerResponse, SetParentRequest};
