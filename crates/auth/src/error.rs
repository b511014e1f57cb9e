use admin_console_http::HttpError;
use thiserror::Error;

/// エラー型
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    Credential(String),

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Token refresh failed: {0}")]
    RefreshFailure(String),

    #[error("Request still unauthorized after refreshing the session")]
    UnauthorizedRetryExhausted,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AuthError {
    /// The server or a proxy answered with an HTML page instead of JSON
    pub fn is_transport_fault(&self) -> bool {
        matches!(self, Self::Http(err) if err.is_transport_fault())
    }

    /// Failures after which the session is gone and the user has to log in again
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            Self::NoRefreshToken | Self::RefreshFailure(_) | Self::UnauthorizedRetryExhausted
        )
    }

    /// Recover an error that travelled through the middleware pipeline
    pub(crate) fn from_pipeline(err: HttpError) -> Self {
        match err {
            HttpError::Middleware(inner) => match inner.downcast::<AuthError>() {
                Ok(auth) => auth,
                Err(other) => Self::Http(HttpError::Middleware(other)),
            },
            other => Self::Http(other),
        }
    }

    pub(crate) fn into_pipeline(self) -> HttpError {
        HttpError::Middleware(anyhow::Error::new(self))
    }
}
