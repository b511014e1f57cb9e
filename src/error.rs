//! Error handling for the admin console client

use std::fmt;

use admin_console_auth::AuthError;
use admin_console_http::HttpError;
use admin_console_router::RouterError;
use thiserror::Error;

/// Unified error type for the admin console client
#[derive(Error, Debug)]
pub enum Error {
    /// Transport, status and response decoding errors
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Login, refresh and session storage errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Navigation error: {0}")]
    Router(#[from] RouterError),

    /// Invalid client options
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// The server answered with an HTML page instead of the API
    pub fn is_transport_fault(&self) -> bool {
        match self {
            Error::Http(err) => err.is_transport_fault(),
            Error::Auth(err) => err.is_transport_fault(),
            _ => false,
        }
    }

    /// Whether the error left the user signed out
    pub fn ends_session(&self) -> bool {
        matches!(self, Error::Auth(err) if err.ends_session())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Config(format!("invalid API URL: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
