//! Admin Console Rust Client Library
//!
//! Client-side session handling for the admin console API: logging in,
//! keeping tokens fresh, attaching them to API calls, guarding routes by
//! role, and asking the user for confirmation.
//!
//! ```no_run
//! use admin_console::AdminConsole;
//!
//! # async fn run() -> admin_console::Result<()> {
//! let console = AdminConsole::new("http://localhost:8000")?;
//! if console.login("alice", "pw").await {
//!     let users = console.users().list_users(0, 100).await?;
//!     println!("{} users", users.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod users;

use std::sync::Arc;

use admin_console_auth::{
    AuthEvent, AuthenticatedClient, FileStorage, MemoryStorage, SessionManager, SessionStorage,
};
use admin_console_confirm::ConfirmDialog;
use admin_console_http::HttpClient;
use admin_console_router::{RouteGuard, RouteTable, Router};
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use url::Url;

pub use admin_console_auth as auth;
pub use admin_console_confirm as confirm;
pub use admin_console_http as http;
pub use admin_console_router as router;

pub use crate::config::ClientOptions;
pub use crate::error::{Error, Result};
pub use crate::users::{NewUser, User, UsersApi};

/// The main entry point for the admin console client
pub struct AdminConsole {
    options: ClientOptions,
    http: HttpClient,
    session: SessionManager,
    api: AuthenticatedClient,
    router: Arc<Router>,
    confirm: ConfirmDialog,
    expiry_redirect: Option<JoinHandle<()>>,
}

impl AdminConsole {
    /// Create a client for the API at `api_url` with default options
    pub fn new(api_url: &str) -> Result<Self> {
        Self::new_with_options(ClientOptions::default().with_api_url(api_url))
    }

    /// Create a client configured from the environment
    pub fn from_env() -> Result<Self> {
        Self::new_with_options(ClientOptions::from_env()?)
    }

    /// Create a client with custom options.
    ///
    /// A session persisted by an earlier run is restored without contacting
    /// the server. When called inside a Tokio runtime, an expired session
    /// sends the router to the login page.
    pub fn new_with_options(options: ClientOptions) -> Result<Self> {
        Url::parse(&options.api_url)?;

        let storage: Arc<dyn SessionStorage> = match &options.session_file {
            Some(path) => Arc::new(FileStorage::open(path)?),
            None => Arc::new(MemoryStorage::new()),
        };

        let http = HttpClient::standard(&options.api_url, options.request_timeout)?;
        let session = SessionManager::new(http.clone(), storage, options.auth_options());
        session.restore_session();
        let api = session.authenticated_client();

        let guard = RouteGuard::new(&options.login_path, &options.home_path);
        let router = Arc::new(Router::new(
            RouteTable::admin_console(),
            guard,
            session.subscribe(),
        ));

        let expiry_redirect = match Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(redirect_on_expiry(
                session.events(),
                router.clone(),
            ))),
            Err(_) => {
                log::warn!("No Tokio runtime; expired sessions will not redirect to login");
                None
            }
        };

        Ok(Self {
            options,
            http,
            session,
            api,
            router,
            confirm: ConfirmDialog::new(),
            expiry_redirect,
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// The unauthenticated base pipeline
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Client that attaches and renews the session's tokens
    pub fn api(&self) -> &AuthenticatedClient {
        &self.api
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn confirm(&self) -> &ConfirmDialog {
        &self.confirm
    }

    pub fn users(&self) -> UsersApi {
        UsersApi::new(self.api.clone())
    }

    /// Log in and, on success, navigate to the home page
    pub async fn login(&self, username: &str, password: &str) -> bool {
        if !self.session.login(username, password).await {
            return false;
        }
        if let Err(err) = self.router.navigate(&self.options.home_path) {
            log::warn!("Navigation after login failed: {}", err);
        }
        true
    }

    /// Log out and return to the login page
    pub fn logout(&self) {
        self.session.logout();
        if let Err(err) = self.router.redirect_to_login() {
            log::warn!("Navigation after logout failed: {}", err);
        }
    }
}

impl Drop for AdminConsole {
    fn drop(&mut self) {
        if let Some(task) = self.expiry_redirect.take() {
            task.abort();
        }
    }
}

/// Send the user to the login page whenever the session expires
async fn redirect_on_expiry(mut events: broadcast::Receiver<AuthEvent>, router: Arc<Router>) {
    loop {
        match events.recv().await {
            Ok(AuthEvent::SessionExpired) => {
                log::debug!("Session expired, redirecting to login");
                if let Err(err) = router.redirect_to_login() {
                    log::warn!("Redirect to login failed: {}", err);
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("Missed {} session events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
