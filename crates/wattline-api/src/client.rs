// Energy backend HTTP client
//
// Wraps `reqwest::Client` with backend-specific URL construction and
// error-payload unwrapping. The backend speaks plain JSON: 2xx bodies are
// the documented shapes, failures carry an `{ "error": "..." }` payload
// (sometimes with HTTP 200 on the realtime endpoint -- handled by the
// caller inspecting `RealtimePowerResponse::error`).

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{DeviceRecord, ErrorPayload, RealtimePowerResponse, SetParentRequest};

/// HTTP client for the energy-monitoring backend's REST API.
pub struct EnergyClient {
    http: reqwest::Client,
    base_url: Url,
}

impl EnergyClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the backend root (e.g. `http://emon.plant.local:8080`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Build a full URL for an API path: `{base}/api/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/{path}"))?)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch the realtime power snapshot: every device with its current
    /// power draw, online status, and declared parent.
    ///
    /// Polled by the diagram view every few seconds. A populated `error`
    /// field in the response body is surfaced as [`Error::Backend`].
    pub async fn realtime_power(&self) -> Result<RealtimePowerResponse, Error> {
        let resp: RealtimePowerResponse = self.get(self.api_url("realtime-power")?).await?;
        if let Some(message) = resp.error {
            return Err(Error::Backend { message });
        }
        Ok(resp)
    }

    /// Fetch the plain device list (configuration view of the same fleet,
    /// without the realtime guarantees of `realtime_power`).
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>, Error> {
        self.get(self.api_url("devices")?).await
    }

    /// Reassign a device's supply parent.
    ///
    /// `parent` of `None` attaches the device directly to the main bus.
    /// Returns the updated record on success.
    pub async fn set_parent_device(
        &self,
        device_id: i64,
        parent: Option<i64>,
    ) -> Result<DeviceRecord, Error> {
        let url = self.api_url(&format!("devices/{device_id}/parent"))?;
        let body = SetParentRequest {
            parent_device_id: parent,
        };
        self.post(url, &body).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and parse the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        Self::parse_body(resp).await
    }

    /// Send a POST request with JSON body and parse the JSON response.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        Self::parse_body(resp).await
    }

    /// Parse a response body, mapping non-2xx statuses to [`Error::Api`]
    /// with the backend's `error` message when one is present.
    async fn parse_body<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorPayload>(&body)
                .ok()
                .and_then(|p| p.error)
                .unwrap_or_else(|| status.to_string());
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}
