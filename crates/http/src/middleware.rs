//! Middleware pipeline
//!
//! Each middleware receives the request and a [`Next`] handle for the rest
//! of the chain, so it can rewrite the request, inspect the response, or
//! run the remainder of the chain more than once.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;

use crate::client::Transport;
use crate::error::HttpError;
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::{PROXY_BYPASS_HEADER, PROXY_BYPASS_VALUE};

#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, HttpError>;
}

/// The remainder of the pipeline after the current middleware
#[derive(Clone, Copy)]
pub struct Next<'a> {
    transport: &'a Transport,
    middlewares: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(transport: &'a Transport, middlewares: &'a [Arc<dyn Middleware>]) -> Self {
        Self {
            transport,
            middlewares,
        }
    }

    pub async fn run(self, request: ApiRequest) -> Result<ApiResponse, HttpError> {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                current
                    .handle(request, Next::new(self.transport, rest))
                    .await
            }
            None => self.transport.send(request).await,
        }
    }
}

/// Headers added to every request that does not already carry them
#[derive(Debug, Clone, Default)]
pub struct DefaultHeaders {
    headers: HeaderMap,
}

impl DefaultHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
        self
    }

    /// Skip the tunnelling proxy's browser warning page
    pub fn proxy_bypass() -> Self {
        Self::new().with(PROXY_BYPASS_HEADER, PROXY_BYPASS_VALUE)
    }
}

#[async_trait]
impl Middleware for DefaultHeaders {
    async fn handle(
        &self,
        mut request: ApiRequest,
        next: Next<'_>,
    ) -> Result<ApiResponse, HttpError> {
        for (name, value) in &self.headers {
            if !request.headers().contains_key(name) {
                request.headers_mut().insert(name.clone(), value.clone());
            }
        }
        next.run(request).await
    }
}

/// Logs every request line and transport-level failure
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLog;

#[async_trait]
impl Middleware for RequestLog {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, HttpError> {
        let method = request.method().clone();
        let path = request.path().to_string();
        log::debug!("API Request: {} {}", method, path);

        let result = next.run(request).await;
        match &result {
            Ok(response) => log::debug!("API Response: {} {} -> {}", method, path, response.status()),
            Err(err) => log::error!("Response error: {} {}: {}", method, path, err),
        }
        result
    }
}

/// Turns HTML error pages into [`HttpError::TransportFault`].
///
/// A gateway or tunnelling proxy that cannot reach the API answers with its
/// own HTML page; passing that on as an ordinary status error would make it
/// look like an API-level rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlFaultDetector;

#[async_trait]
impl Middleware for HtmlFaultDetector {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, HttpError> {
        let response = next.run(request).await?;
        if !response.is_success() && response.is_html() {
            log::error!("Received HTML instead of JSON - possible proxy issue");
            return Err(HttpError::TransportFault {
                status: response.status(),
                message: "received an HTML page instead of JSON; check the network connection or service status".to_string(),
            });
        }
        Ok(response)
    }
}
