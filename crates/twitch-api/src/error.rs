use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl ApiError {
    /// Whether the request never produced a usable response body.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Http(_) | ApiError::Status { .. })
    }
}
