//! Configuration options for the admin console client

use std::path::PathBuf;
use std::time::Duration;

use admin_console_auth::{AuthOptions, RefreshPolicy};
use admin_console_http::DEFAULT_TIMEOUT;

use crate::error::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

pub const API_URL_ENV: &str = "ADMIN_CONSOLE_API_URL";
pub const SESSION_FILE_ENV: &str = "ADMIN_CONSOLE_SESSION_FILE";
pub const TIMEOUT_SECS_ENV: &str = "ADMIN_CONSOLE_TIMEOUT_SECS";

/// Configuration options for the admin console client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the API server
    pub api_url: String,

    /// Applied to every request
    pub request_timeout: Duration,

    /// When the access token is renewed ahead of a request
    pub refresh_policy: RefreshPolicy,

    /// Whether tokens and the identity are written to storage
    pub persist_session: bool,

    /// Session file; an in-memory store is used when unset
    pub session_file: Option<PathBuf>,

    pub login_path: String,

    pub home_path: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            refresh_policy: RefreshPolicy::default(),
            persist_session: true,
            session_file: None,
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
        }
    }
}

impl ClientOptions {
    /// Defaults overridden by `ADMIN_CONSOLE_*` environment variables
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut options = Self::default();

        if let Some(url) = lookup(API_URL_ENV) {
            options.api_url = url;
        }
        if let Some(path) = lookup(SESSION_FILE_ENV) {
            options.session_file = Some(PathBuf::from(path));
        }
        if let Some(secs) = lookup(TIMEOUT_SECS_ENV) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::config(format!(
                    "{} must be a number of seconds, got {:?}",
                    TIMEOUT_SECS_ENV, secs
                ))
            })?;
            options.request_timeout = Duration::from_secs(secs);
        }

        Ok(options)
    }

    /// Set the API base URL
    pub fn with_api_url(mut self, value: &str) -> Self {
        self.api_url = value.to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set when tokens are refreshed ahead of requests
    pub fn with_refresh_policy(mut self, value: RefreshPolicy) -> Self {
        self.refresh_policy = value;
        self
    }

    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Store the session in a JSON file at `path`
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    pub fn with_login_path(mut self, value: &str) -> Self {
        self.login_path = value.to_string();
        self
    }

    pub fn with_home_path(mut self, value: &str) -> Self {
        self.home_path = value.to_string();
        self
    }

    /// Options for the session manager
    pub fn auth_options(&self) -> AuthOptions {
        AuthOptions::default()
            .with_persist_session(self.persist_session)
            .with_refresh_policy(self.refresh_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.api_url, "http://localhost:8000");
        assert_eq!(options.request_timeout, Duration::from_secs(10));
        assert_eq!(options.refresh_policy, RefreshPolicy::BeforeEveryRequest);
        assert!(options.persist_session);
        assert!(options.session_file.is_none());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let options = ClientOptions::from_lookup(lookup(&[
            (API_URL_ENV, "https://admin.example.com"),
            (SESSION_FILE_ENV, "/tmp/session.json"),
            (TIMEOUT_SECS_ENV, " 3 "),
        ]))
        .unwrap();

        assert_eq!(options.api_url, "https://admin.example.com");
        assert_eq!(options.session_file, Some(PathBuf::from("/tmp/session.json")));
        assert_eq!(options.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_from_lookup_rejects_bad_timeout() {
        let err = ClientOptions::from_lookup(lookup(&[(TIMEOUT_SECS_ENV, "soon")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_auth_options_follow_client_options() {
        let options = ClientOptions::default()
            .with_persist_session(false)
            .with_refresh_policy(RefreshPolicy::OnUnauthorized);
        let auth = options.auth_options();
        assert!(!auth.persist_session);
        assert_eq!(auth.refresh_policy, RefreshPolicy::OnUnauthorized);
    }
}
