//! Buffered response

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::HttpError;

/// A fully-read response. The body is buffered so middlewares can look at
/// it without consuming it for the caller.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn a non-success status into [`HttpError::Status`]
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HttpError::Status {
                status: self.status,
                body: self.text(),
            })
        }
    }

    /// Whether the body is an HTML document rather than an API payload
    pub fn is_html(&self) -> bool {
        let declared_html = self
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("text/html"))
            .unwrap_or(false);
        if declared_html {
            return true;
        }
        let head = &self.body[..self.body.len().min(512)];
        String::from_utf8_lossy(head)
            .to_ascii_lowercase()
            .contains("<!doctype html")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_detects_html_without_content_type() {
        let response = ApiResponse::new(
            StatusCode::BAD_GATEWAY,
            HeaderMap::new(),
            Bytes::from_static(b"<!DOCTYPE html><html><body>offline</body></html>"),
        );
        assert!(response.is_html());
    }

    #[test]
    fn test_json_error_body_is_not_html() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let response = ApiResponse::new(
            StatusCode::BAD_REQUEST,
            headers,
            Bytes::from_static(br#"{"detail":"Username already registered"}"#),
        );
        assert!(!response.is_html());
        match response.error_for_status() {
            Err(HttpError::Status { status, body }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(body.contains("already registered"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
