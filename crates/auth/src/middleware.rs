//! Authentication middlewares for the HTTP pipeline

use admin_console_http::{ApiRequest, ApiResponse, HttpError, Middleware, Next, StatusCode};
use async_trait::async_trait;

use crate::error::AuthError;
use crate::manager::SessionManager;

/// Attaches `Authorization: Bearer <access token>`, renewing the token
/// first when the session's [`RefreshPolicy`](crate::RefreshPolicy) asks for it.
///
/// Requests to the login and refresh endpoints pass through untouched so
/// a refresh can never trigger another refresh.
pub struct BearerAuth {
    session: SessionManager,
}

impl BearerAuth {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Middleware for BearerAuth {
    async fn handle(
        &self,
        mut request: ApiRequest,
        next: Next<'_>,
    ) -> Result<ApiResponse, HttpError> {
        if self.session.is_auth_endpoint(&request) {
            return next.run(request).await;
        }

        if !request.is_retried() && self.session.should_refresh_before_request() {
            // a failure here surfaces as a 401 handled by RetryOnUnauthorized
            if let Err(err) = self.session.refresh_token().await {
                log::warn!("Pre-request token refresh failed: {}", err);
            }
        }

        if let Some(token) = self.session.access_token() {
            request.set_bearer_auth(&token);
        }
        next.run(request).await
    }
}

/// Resends a request once after a 401, with a freshly refreshed token.
///
/// If the refresh fails or the resent request is rejected again, the
/// session is expired and the error is returned to the caller.
pub struct RetryOnUnauthorized {
    session: SessionManager,
}

impl RetryOnUnauthorized {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Middleware for RetryOnUnauthorized {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, HttpError> {
        if self.session.is_auth_endpoint(&request) || request.is_retried() {
            return next.run(request).await;
        }

        let mut retry = request.clone();
        let response = next.run(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        log::debug!(
            "{} {} was unauthorized; refreshing and retrying once",
            retry.method(),
            retry.path()
        );
        retry.mark_retried();

        match self.session.refresh_token().await {
            Ok(pair) => retry.set_bearer_auth(&pair.access_token),
            Err(err) => {
                log::error!("Refresh after 401 failed: {}", err);
                // a failed refresh has already expired the session
                if !matches!(err, AuthError::RefreshFailure(_)) {
                    self.session.expire();
                }
                return Err(err.into_pipeline());
            }
        }

        let response = next.run(retry).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.session.expire();
            return Err(AuthError::UnauthorizedRetryExhausted.into_pipeline());
        }
        Ok(response)
    }
}
