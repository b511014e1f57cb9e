use http::StatusCode;
use thiserror::Error;

/// エラー型
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The server (or a proxy in front of it) answered with an HTML page
    /// instead of JSON.
    #[error("API service unavailable ({status}): {message}")]
    TransportFault { status: StatusCode, message: String },

    /// Raised by a middleware; callers that know the concrete type can
    /// downcast it back.
    #[error("{0}")]
    Middleware(#[from] anyhow::Error),
}

impl HttpError {
    /// Status code carried by the error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } | Self::TransportFault { status, .. } => Some(*status),
            Self::Network(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_transport_fault(&self) -> bool {
        matches!(self, Self::TransportFault { .. })
    }
}
