//! Auth store: login, logout, single-flight refresh and restore

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use admin_console_http::{ApiRequest, ApiResponse, HttpClient, StatusCode};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use tokio::sync::{broadcast, watch};

use crate::client::AuthenticatedClient;
use crate::error::AuthError;
use crate::session::{AuthEvent, Session};
use crate::storage::{
    SessionStorage, ACCESS_TOKEN_KEY, ALL_KEYS, LEGACY_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY,
};
use crate::token::{Claims, Identity, RefreshRequest, TokenPair, TokenResponse};

pub const DEFAULT_TOKEN_PATH: &str = "/api/v1/auth/token";
pub const DEFAULT_REFRESH_PATH: &str = "/api/v1/auth/refresh";

/// When the bearer middleware renews the access token ahead of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Refresh before every request while a refresh token is held
    #[default]
    BeforeEveryRequest,
    /// Refresh only when the access token expires within `leeway`
    WhenExpiring { leeway: Duration },
    /// Never refresh ahead of time; rely on the 401 retry
    OnUnauthorized,
}

/// クライアントオプション
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub token_path: String,
    pub refresh_path: String,
    pub persist_session: bool,
    pub refresh_policy: RefreshPolicy,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            persist_session: true,
            refresh_policy: RefreshPolicy::default(),
        }
    }
}

impl AuthOptions {
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    pub fn with_refresh_policy(mut self, value: RefreshPolicy) -> Self {
        self.refresh_policy = value;
        self
    }

    pub fn with_token_path(mut self, value: &str) -> Self {
        self.token_path = value.to_string();
        self
    }

    pub fn with_refresh_path(mut self, value: &str) -> Self {
        self.refresh_path = value.to_string();
        self
    }
}

type RefreshOutcome = Result<TokenPair, String>;
type RefreshFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

enum RefreshState {
    Idle,
    /// Every caller awaits a clone of the same pending refresh
    Refreshing(RefreshFlight),
    /// Last refresh failed; behaves like `Idle` for new attempts
    Failed(String),
}

struct Inner {
    http: HttpClient,
    storage: Arc<dyn SessionStorage>,
    options: AuthOptions,
    state: watch::Sender<Session>,
    refresh: Mutex<RefreshState>,
    /// Bumped whenever a session ends or a new one starts, so a refresh
    /// that was in flight at the time cannot write its result back
    epoch: AtomicU64,
    events: broadcast::Sender<AuthEvent>,
}

/// Owns the login session.
///
/// Cheap to clone; all clones share the same session. Consumers read the
/// session through [`session`](Self::session) or [`subscribe`](Self::subscribe)
/// and never mutate it.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// `http` must be the base pipeline without authentication middlewares;
    /// login and refresh calls go through it directly.
    pub fn new(http: HttpClient, storage: Arc<dyn SessionStorage>, options: AuthOptions) -> Self {
        let (state, _) = watch::channel(Session::default());
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                http,
                storage,
                options,
                state,
                refresh: Mutex::new(RefreshState::Idle),
                epoch: AtomicU64::new(0),
                events,
            }),
        }
    }

    pub fn options(&self) -> &AuthOptions {
        &self.inner.options
    }

    /// Client for API calls that attaches and renews this session's tokens
    pub fn authenticated_client(&self) -> AuthenticatedClient {
        AuthenticatedClient::new(&self.inner.http, self.clone())
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.state.borrow().is_logged_in
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token.clone()
    }

    pub fn current_refresh_token(&self) -> Option<String> {
        self.inner.state.borrow().refresh_token.clone()
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.inner.lock_refresh(), RefreshState::Refreshing(_))
    }

    /// Reason the most recent refresh failed, until the next login or successful refresh
    pub fn last_refresh_error(&self) -> Option<String> {
        match &*self.inner.lock_refresh() {
            RefreshState::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Log in, reporting only success.
    ///
    /// Any failure resets the session; use [`try_login`](Self::try_login)
    /// to learn why it failed.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        match self.try_login(username, password).await {
            Ok(_) => true,
            Err(err) => {
                log::error!("Login failed: {}", err);
                false
            }
        }
    }

    /// Log in, returning the signed-in identity or the reason it failed.
    ///
    /// On failure the session is reset and nothing stays persisted.
    pub async fn try_login(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        match self.sign_in(username, password).await {
            Ok(identity) => Ok(identity),
            Err(err) => {
                self.logout();
                Err(err)
            }
        }
    }

    async fn sign_in(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        let request = ApiRequest::post(&self.inner.options.token_path)
            .form(&[("username", username), ("password", password)]);

        let response = self.inner.http.send(request).await?;
        if matches!(
            response.status(),
            StatusCode::BAD_REQUEST
                | StatusCode::UNAUTHORIZED
                | StatusCode::FORBIDDEN
                | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            return Err(AuthError::Credential(error_detail(&response)));
        }

        let tokens: TokenResponse = response.error_for_status()?.json()?;
        let identity = Claims::decode(&tokens.access_token)?.identity();

        self.inner.invalidate_refresh(true);
        self.inner
            .store_tokens(&tokens.access_token, tokens.refresh_token.as_deref(), &identity)?;

        log::debug!("Signed in as {} ({})", identity.username, identity.role);
        let _ = self.inner.events.send(AuthEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    /// Clear the session and every persisted entry. Idempotent.
    pub fn logout(&self) {
        if self.inner.end_session() {
            log::debug!("Signed out");
            let _ = self.inner.events.send(AuthEvent::SignedOut);
        }
    }

    /// End the session because it can no longer be renewed and announce
    /// [`AuthEvent::SessionExpired`] so the user is sent back to login.
    /// Nothing is announced when no session was active.
    pub fn expire(&self) {
        self.inner.expire();
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// Only one refresh runs at a time: callers arriving while one is in
    /// flight receive its result instead of starting another. The refresh
    /// runs on its own task and completes even if every caller stops
    /// waiting. On failure the session is expired.
    pub async fn refresh_token(&self) -> Result<TokenPair, AuthError> {
        let flight = self.inner.join_or_start_refresh()?;
        flight.await.map_err(AuthError::RefreshFailure)
    }

    /// Reactivate a persisted session without contacting the server.
    ///
    /// The stored access token is trusted until the server rejects it.
    /// Returns whether a logged-in session was restored.
    pub fn restore_session(&self) -> bool {
        let storage = &self.inner.storage;
        let access_token = storage
            .get_item(ACCESS_TOKEN_KEY)
            .or_else(|| storage.get_item(LEGACY_TOKEN_KEY));
        let refresh_token = storage.get_item(REFRESH_TOKEN_KEY);
        let user = storage
            .get_item(USER_KEY)
            .and_then(|raw| match serde_json::from_str::<Identity>(&raw) {
                Ok(user) => Some(user),
                Err(err) => {
                    log::warn!("Ignoring cached user: {}", err);
                    None
                }
            });

        let mut restored = false;
        self.inner.state.send_modify(|session| {
            session.access_token = access_token;
            session.refresh_token = refresh_token;
            session.user = user;
            session.sync_logged_in();
            restored = session.is_logged_in;
        });

        if restored {
            log::debug!("Restored persisted session");
        }
        restored
    }

    pub(crate) fn is_auth_endpoint(&self, request: &ApiRequest) -> bool {
        request.targets(&self.inner.options.token_path)
            || request.targets(&self.inner.options.refresh_path)
    }

    /// Whether the bearer middleware should renew the token before sending
    pub(crate) fn should_refresh_before_request(&self) -> bool {
        if self.is_refreshing() {
            return false;
        }
        let session = self.inner.state.borrow();
        if session.refresh_token.is_none() {
            return false;
        }
        match self.inner.options.refresh_policy {
            RefreshPolicy::BeforeEveryRequest => true,
            RefreshPolicy::WhenExpiring { leeway } => match session.access_token.as_deref() {
                Some(token) => Claims::decode(token)
                    .map(|claims| claims.expires_within(leeway))
                    .unwrap_or(true),
                None => true,
            },
            RefreshPolicy::OnUnauthorized => false,
        }
    }
}

impl Inner {
    fn lock_refresh(&self) -> MutexGuard<'_, RefreshState> {
        self.refresh.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn join_or_start_refresh(self: &Arc<Self>) -> Result<RefreshFlight, AuthError> {
        let mut refresh = self.lock_refresh();
        if let RefreshState::Refreshing(flight) = &*refresh {
            log::debug!("Joining in-flight token refresh");
            return Ok(flight.clone());
        }

        let refresh_token = self
            .state
            .borrow()
            .refresh_token
            .clone()
            .ok_or(AuthError::NoRefreshToken)?;
        let epoch = self.epoch.load(Ordering::SeqCst);

        // the task settles the refresh state even if every caller stops waiting
        let task = tokio::spawn(self.clone().run_refresh(epoch, refresh_token));
        let inner = self.clone();
        let flight = async move {
            task.await.unwrap_or_else(|err| {
                let reason = format!("token refresh task failed: {}", err);
                log::error!("{}", reason);
                if inner.settle(epoch, RefreshState::Failed(reason.clone())) {
                    inner.expire();
                }
                Err(reason)
            })
        }
        .boxed()
        .shared();
        *refresh = RefreshState::Refreshing(flight.clone());
        self.state.send_modify(|session| session.is_refreshing = true);

        Ok(flight)
    }

    async fn run_refresh(self: Arc<Self>, epoch: u64, refresh_token: String) -> RefreshOutcome {
        log::debug!("Refreshing access token");
        let result = match self.request_refresh(&refresh_token).await {
            Ok((pair, identity)) if self.is_current(epoch) => self
                .store_tokens(&pair.access_token, Some(&pair.refresh_token), &identity)
                .map(|()| pair),
            Ok(_) => {
                log::debug!("Discarding refresh result for a session that has ended");
                return Err("session ended while the token was being refreshed".to_string());
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(pair) => {
                self.settle(epoch, RefreshState::Idle);
                let _ = self.events.send(AuthEvent::TokenRefreshed);
                Ok(pair)
            }
            Err(err) => {
                let reason = err.to_string();
                log::error!("Token refresh failed: {}", reason);
                if self.settle(epoch, RefreshState::Failed(reason.clone())) {
                    self.expire();
                }
                Err(reason)
            }
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<(TokenPair, Identity), AuthError> {
        let request =
            ApiRequest::post(&self.options.refresh_path).json(&RefreshRequest { refresh_token })?;
        let response = self.http.send(request).await?.error_for_status()?;
        let body: TokenResponse = response.json()?;
        let identity = Claims::decode(&body.access_token)?.identity();

        let pair = TokenPair {
            access_token: body.access_token,
            // the server may echo the current refresh token or omit it
            refresh_token: body
                .refresh_token
                .unwrap_or_else(|| refresh_token.to_string()),
        };
        Ok((pair, identity))
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Leave the refreshing state unless the session changed meanwhile.
    /// Returns whether the state was updated.
    fn settle(&self, epoch: u64, next: RefreshState) -> bool {
        let mut refresh = self.lock_refresh();
        if !self.is_current(epoch) {
            return false;
        }
        *refresh = next;
        self.state.send_modify(|session| session.is_refreshing = false);
        true
    }

    /// Start a new session epoch. A refresh in flight is detached; a
    /// recorded failure is kept unless `clear_failure` is set.
    fn invalidate_refresh(&self, clear_failure: bool) {
        let mut refresh = self.lock_refresh();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let was_refreshing = matches!(*refresh, RefreshState::Refreshing(_));
        if clear_failure || was_refreshing {
            *refresh = RefreshState::Idle;
        }
        if was_refreshing {
            self.state.send_modify(|session| session.is_refreshing = false);
        }
    }

    fn store_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        identity: &Identity,
    ) -> Result<(), AuthError> {
        if self.options.persist_session {
            self.storage.set_item(ACCESS_TOKEN_KEY, access_token)?;
            match refresh_token {
                Some(token) => self.storage.set_item(REFRESH_TOKEN_KEY, token)?,
                None => self.storage.remove_item(REFRESH_TOKEN_KEY)?,
            }
            self.storage
                .set_item(USER_KEY, &serde_json::to_string(identity)?)?;
        }

        self.state.send_modify(|session| {
            session.access_token = Some(access_token.to_string());
            session.refresh_token = refresh_token.map(str::to_string);
            session.user = Some(identity.clone());
            session.sync_logged_in();
        });
        Ok(())
    }

    /// Reset the session and storage; returns whether anything was set
    fn end_session(&self) -> bool {
        self.invalidate_refresh(false);

        for key in ALL_KEYS {
            if let Err(err) = self.storage.remove_item(key) {
                log::warn!("Failed to remove {} from storage: {}", key, err);
            }
        }

        let mut was_active = false;
        self.state.send_modify(|session| {
            was_active = session.access_token.is_some()
                || session.refresh_token.is_some()
                || session.user.is_some();
            *session = Session::default();
        });
        was_active
    }

    fn expire(&self) {
        if self.end_session() {
            log::debug!("Session expired");
            let _ = self.events.send(AuthEvent::SessionExpired);
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Human-readable reason from an API error body
fn error_detail(response: &ApiResponse) -> String {
    match response.json::<ErrorBody>() {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => format!("{}: {}", response.status(), response.text()),
    }
}
