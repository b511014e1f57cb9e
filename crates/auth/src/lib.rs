//! Session management for the admin console client
//!
//! [`SessionManager`] owns the login session: it exchanges credentials for
//! a token pair, persists tokens to a [`SessionStorage`], refreshes them
//! with a single-flight guarantee, and publishes every change as a
//! read-only [`Session`] snapshot. [`AuthenticatedClient`] layers bearer
//! authentication and refresh-and-retry on top of the base HTTP pipeline.

mod client;
mod error;
mod manager;
mod middleware;
mod session;
mod storage;
mod token;

pub use client::AuthenticatedClient;
pub use error::AuthError;
pub use manager::{AuthOptions, RefreshPolicy, SessionManager};
pub use middleware::{BearerAuth, RetryOnUnauthorized};
pub use session::{AuthEvent, Session};
pub use storage::{
    FileStorage, MemoryStorage, SessionStorage, ACCESS_TOKEN_KEY, LEGACY_TOKEN_KEY,
    REFRESH_TOKEN_KEY, USER_KEY,
};
pub use token::{Claims, Identity, TokenPair, TokenResponse};

pub type Result<T> = std::result::Result<T, AuthError>;
