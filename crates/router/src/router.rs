//! Navigator applying guard decisions

use std::sync::RwLock;

use admin_console_auth::Session;
use tokio::sync::{broadcast, watch};

use crate::error::RouterError;
use crate::guard::{GuardDecision, Notice, RouteGuard};
use crate::route::{normalize, RouteTable};

const MAX_REDIRECTS: usize = 8;

/// Where a navigation ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Completed {
        path: String,
        name: Option<String>,
    },
    Redirected {
        from: String,
        to: String,
        name: Option<String>,
    },
}

impl Navigation {
    pub fn path(&self) -> &str {
        match self {
            Self::Completed { path, .. } => path,
            Self::Redirected { to, .. } => to,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Completed { name, .. } | Self::Redirected { name, .. } => name.as_deref(),
        }
    }
}

pub struct Router {
    table: RouteTable,
    guard: RouteGuard,
    session: watch::Receiver<Session>,
    /// Visited locations, most recent last
    history: RwLock<Vec<String>>,
    notices: broadcast::Sender<Notice>,
}

impl Router {
    /// `session` is the read-only view published by the session manager
    pub fn new(table: RouteTable, guard: RouteGuard, session: watch::Receiver<Session>) -> Self {
        let (notices, _) = broadcast::channel(16);
        Self {
            table,
            guard,
            session,
            history: RwLock::new(Vec::new()),
            notices,
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    /// Current location, once a navigation has completed
    pub fn current(&self) -> Option<String> {
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    pub fn history(&self) -> Vec<String> {
        self.history.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Notices raised by the guard, e.g. permission denied
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Navigate to `path`, following route redirects and guard decisions
    pub fn navigate(&self, path: &str) -> Result<Navigation, RouterError> {
        self.go(path, false)
    }

    /// Like [`navigate`](Self::navigate), but the destination takes the
    /// place of the current history entry
    pub fn replace(&self, path: &str) -> Result<Navigation, RouterError> {
        self.go(path, true)
    }

    /// Send the user to the login screen, e.g. after the session expired
    pub fn redirect_to_login(&self) -> Result<Navigation, RouterError> {
        let login = self.guard.login_path.clone();
        self.replace(&login)
    }

    fn go(&self, path: &str, replace: bool) -> Result<Navigation, RouterError> {
        let session = self.session.borrow().clone();
        let requested = normalize(path);
        let mut target = requested.clone();

        for _ in 0..=MAX_REDIRECTS {
            let route = self
                .table
                .resolve(&target)
                .ok_or_else(|| RouterError::NotFound(target.clone()))?;

            if let Some(to) = route.redirect {
                target = normalize(&to);
                continue;
            }

            match self.guard.check(&session, &route) {
                GuardDecision::Allow => {
                    let mut history = self.history.write().unwrap_or_else(|e| e.into_inner());
                    if replace {
                        history.pop();
                    }
                    history.push(target.clone());
                    drop(history);

                    return Ok(if target == requested {
                        Navigation::Completed {
                            path: target,
                            name: route.name,
                        }
                    } else {
                        log::debug!("Navigation to {} redirected to {}", requested, target);
                        Navigation::Redirected {
                            from: requested,
                            to: target,
                            name: route.name,
                        }
                    });
                }
                GuardDecision::Redirect { to, notice } => {
                    if let Some(notice) = notice {
                        let _ = self.notices.send(notice);
                    }
                    target = normalize(&to);
                }
            }
        }

        Err(RouterError::RedirectLoop(requested))
    }
}
