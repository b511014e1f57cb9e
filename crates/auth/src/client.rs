//! Authenticated API client

use admin_console_http::{ApiRequest, ApiResponse, HttpClient};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AuthError;
use crate::manager::SessionManager;
use crate::middleware::{BearerAuth, RetryOnUnauthorized};

/// The base pipeline wrapped with [`BearerAuth`] and, outermost,
/// [`RetryOnUnauthorized`]
#[derive(Clone)]
pub struct AuthenticatedClient {
    http: HttpClient,
    session: SessionManager,
}

impl AuthenticatedClient {
    pub fn new(base: &HttpClient, session: SessionManager) -> Self {
        let http = base
            .wrap(BearerAuth::new(session.clone()))
            .wrap(RetryOnUnauthorized::new(session.clone()));
        Self { http, session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Send a request; any status other than an unrecoverable 401 is
    /// returned as a response
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        self.http
            .send(request)
            .await
            .map_err(AuthError::from_pipeline)
    }

    /// Send, require a success status and decode the JSON body
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, AuthError> {
        let response = self.send(request).await?.error_for_status()?;
        Ok(response.json()?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AuthError> {
        self.execute(ApiRequest::get(path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, AuthError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::post(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), AuthError> {
        self.send(ApiRequest::delete(path)).await?.error_for_status()?;
        Ok(())
    }
}
