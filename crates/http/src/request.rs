//! Outgoing request description

use http::header::{HeaderName, HeaderValue, AUTHORIZATION};
use http::{HeaderMap, Method};
use serde::Serialize;

use crate::error::HttpError;

/// Request body, kept in a form that can be replayed on retry
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Vec<u8>),
    Form(Vec<(String, String)>),
}

/// A request relative to the client's base URL.
///
/// Unlike a `reqwest::RequestBuilder` this is plain data: middlewares can
/// inspect and rewrite it, and it can be cloned to resend after a token
/// refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<RequestBody>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: &str) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a header; names or values that are not valid HTTP are dropped
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let Err(err) = self.insert_header(name, value) {
            log::warn!("Ignoring header {}: {}", name, err);
        }
        self
    }

    /// Insert a header, replacing any previous value
    pub fn insert_header(&mut self, name: &str, value: &str) -> Result<(), HttpError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| HttpError::InvalidHeader(err.to_string()))?;
        let value =
            HeaderValue::from_str(value).map_err(|err| HttpError::InvalidHeader(err.to_string()))?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn bearer_auth(mut self, token: &str) -> Self {
        self.set_bearer_auth(token);
        self
    }

    pub fn set_bearer_auth(&mut self, token: &str) {
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(value) => {
                self.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => log::warn!("Access token is not a valid header value; sending without it"),
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, HttpError> {
        self.body = Some(RequestBody::Json(serde_json::to_vec(body)?));
        Ok(self)
    }

    /// Form-encoded body (`application/x-www-form-urlencoded`)
    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.body = Some(RequestBody::Form(fields));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Whether this request is already a resend after an authorization failure
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// True when the request path contains `fragment`
    pub fn targets(&self, fragment: &str) -> bool {
        self.path.contains(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_header_is_dropped() {
        let request = ApiRequest::get("/api/v1/stats/")
            .header("x-ok", "1")
            .header("bad header", "1");
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.headers()["x-ok"], "1");
    }

    #[test]
    fn test_bearer_auth_replaces_previous_token() {
        let mut request = ApiRequest::get("/api/v1/users/").bearer_auth("old");
        request.set_bearer_auth("new");
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer new");
    }

    #[test]
    fn test_form_body_keeps_field_order() {
        let request = ApiRequest::post("/api/v1/auth/token")
            .form(&[("username", "alice"), ("password", "pw")]);
        assert_eq!(
            request.body(),
            Some(&RequestBody::Form(vec![
                ("username".to_string(), "alice".to_string()),
                ("password".to_string(), "pw".to_string()),
            ]))
        );
        assert!(request.targets("/auth/token"));
        assert!(!request.is_retried());
    }
}
