//! Pipeline owner and transport

use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use url::Url;

use crate::error::HttpError;
use crate::middleware::{DefaultHeaders, HtmlFaultDetector, Middleware, Next, RequestLog};
use crate::request::{ApiRequest, RequestBody};
use crate::response::ApiResponse;

/// Timeout applied to every call unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends a request that has been through every middleware
pub(crate) struct Transport {
    base_url: Url,
    client: Client,
}

impl Transport {
    fn url_for(&self, request: &ApiRequest) -> Result<Url, HttpError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = request.path();
        let mut url = if path.starts_with('/') {
            Url::parse(&format!("{}{}", base, path))?
        } else {
            Url::parse(&format!("{}/{}", base, path))?
        };

        if !request.query_pairs().is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in request.query_pairs() {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    pub(crate) async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpError> {
        let url = self.url_for(&request)?;

        let mut builder = self
            .client
            .request(request.method().clone(), url)
            .headers(request.headers().clone());

        builder = match request.body() {
            Some(RequestBody::Json(bytes)) => builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(bytes.clone()),
            Some(RequestBody::Form(fields)) => builder.form(fields),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(ApiResponse::new(status, headers, body))
    }
}

/// HTTP client with an ordered middleware pipeline.
///
/// Cloning is cheap and shares the connection pool and the pipeline.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<Transport>,
    middlewares: Arc<[Arc<dyn Middleware>]>,
}

impl HttpClient {
    pub fn builder(base_url: &str) -> HttpClientBuilder {
        HttpClientBuilder::new(base_url)
    }

    /// Client with the pipeline every API call needs: request logging, the
    /// proxy bypass header, and HTML fault detection
    pub fn standard(base_url: &str, timeout: Duration) -> Result<Self, HttpError> {
        Self::builder(base_url)
            .timeout(timeout)
            .with(RequestLog)
            .with(DefaultHeaders::proxy_bypass())
            .with(HtmlFaultDetector)
            .build()
    }

    pub fn base_url(&self) -> &Url {
        &self.transport.base_url
    }

    /// Number of middlewares in the pipeline
    pub fn depth(&self) -> usize {
        self.middlewares.len()
    }

    /// A client sharing this one's transport with `middleware` added as the
    /// new outermost layer
    pub fn wrap<M: Middleware>(&self, middleware: M) -> Self {
        let mut middlewares: Vec<Arc<dyn Middleware>> = Vec::with_capacity(self.middlewares.len() + 1);
        middlewares.push(Arc::new(middleware));
        middlewares.extend(self.middlewares.iter().cloned());
        Self {
            transport: self.transport.clone(),
            middlewares: middlewares.into(),
        }
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpError> {
        Next::new(&self.transport, &self.middlewares)
            .run(request)
            .await
    }
}

pub struct HttpClientBuilder {
    base_url: String,
    timeout: Option<Duration>,
    client: Option<Client>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl HttpClientBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
            client: None,
            middlewares: Vec::new(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Use a preconfigured reqwest client; the builder's timeout is ignored
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Append a middleware; earlier ones run first on the way out
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn with_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn build(self) -> Result<HttpClient, HttpError> {
        let base_url = Url::parse(&self.base_url)?;
        let client = match self.client {
            Some(client) => client,
            None => {
                let mut builder = Client::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build()?
            }
        };

        Ok(HttpClient {
            transport: Arc::new(Transport { base_url, client }),
            middlewares: self.middlewares.into(),
        })
    }
}
