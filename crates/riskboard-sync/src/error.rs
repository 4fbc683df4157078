use riskboard_core::PayloadError;
use thiserror::Error;

/// Any way a dashboard or export request can fail.
#[derive(Debug, Error)]
pub enum FetchError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid dashboard payload: {0}")]
    Schema(#[from] PayloadError),
}
