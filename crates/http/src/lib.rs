//! HTTP plumbing for the admin console client
//!
//! Requests go through an explicit, ordered middleware pipeline that is
//! built once with [`HttpClientBuilder`] and then shared by cloning the
//! resulting [`HttpClient`]. Authentication middlewares live in the auth
//! crate and are layered on top of the base pipeline built here.

mod client;
mod error;
mod middleware;
mod request;
mod response;

pub use client::{HttpClient, HttpClientBuilder, DEFAULT_TIMEOUT};
pub use error::HttpError;
pub use middleware::{DefaultHeaders, HtmlFaultDetector, Middleware, Next, RequestLog};
pub use request::{ApiRequest, RequestBody};
pub use response::ApiResponse;

pub use http::{Method, StatusCode};

/// Header the tunnelling proxy in front of the API checks before serving its interstitial page
pub const PROXY_BYPASS_HEADER: &str = "ngrok-skip-browser-warning";

/// Any value works for the proxy; this one is what deployed frontends send
pub const PROXY_BYPASS_VALUE: &str = "69420";

pub type Result<T> = std::result::Result<T, HttpError>;
