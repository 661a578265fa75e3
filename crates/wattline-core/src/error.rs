use thiserror::Error;

/// Top-level error type for `wattline-core`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Error from the backend API client.
    #[error("backend API error: {0}")]
    Api(#[from] wattline_api::Error),

    /// Configuration rejected before any network activity.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
