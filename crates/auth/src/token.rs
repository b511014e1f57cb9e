//! Token payloads and claim decoding

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// The user behind a session, as carried in the access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub role: String,
}

/// Access and refresh token issued together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Body returned by the token and refresh endpoints.
///
/// Older deployments of the token endpoint return no refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Claims read from the access token payload.
///
/// The signature is not checked here: the server does that on every call,
/// and the client only needs the identity and expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn decode(token: &str) -> Result<Self, AuthError> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => {
                return Err(AuthError::InvalidToken(
                    "expected three dot-separated segments".to_string(),
                ))
            }
        };

        // accept the standard alphabet as well, some issuers pad or use it
        let normalized: String = payload
            .trim_end_matches('=')
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                other => other,
            })
            .collect();

        let bytes = URL_SAFE_NO_PAD
            .decode(normalized.as_bytes())
            .map_err(|err| AuthError::InvalidToken(format!("payload is not base64: {}", err)))?;

        serde_json::from_slice(&bytes)
            .map_err(|err| AuthError::InvalidToken(format!("payload is not valid claims: {}", err)))
    }

    pub fn identity(&self) -> Identity {
        Identity {
            username: self.sub.clone(),
            role: self.role.clone(),
        }
    }

    /// True when the token expires within `leeway` from now. Tokens without
    /// an `exp` claim never expire.
    pub fn expires_within(&self, leeway: Duration) -> bool {
        match self.exp {
            Some(exp) => {
                let leeway = i64::try_from(leeway.as_secs()).unwrap_or(i64::MAX);
                chrono::Utc::now().timestamp().saturating_add(leeway) >= exp
            }
            None => false,
        }
    }
}
