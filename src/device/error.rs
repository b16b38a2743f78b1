use std::time::Duration;
use thiserror::Error;

/// Error types for playback device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Device rejected the command ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Session expired; a new access token is required")]
    SessionExpired,
    #[error("Device did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Device is not active")]
    Inactive,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Invalid device URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Device error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for DeviceError {
    fn from(err: serde_json::Error) -> Self {
        DeviceError::InvalidResponse(err.to_string())
    }
}
