//! Navigation guard

use admin_console_auth::Session;

use crate::route::ResolvedRoute;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message the UI should show the user (a toast)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn error(message: &str) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect { to: String, notice: Option<Notice> },
}

/// Decides whether a navigation may proceed.
///
/// Decisions depend only on the session snapshot and the target route's
/// metadata; a stale snapshot is acceptable until the next session update.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    pub login_path: String,
    pub home_path: String,
    pub denied_message: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
            denied_message: "You do not have permission to access this page.".to_string(),
        }
    }
}

impl RouteGuard {
    pub fn new(login_path: &str, home_path: &str) -> Self {
        Self {
            login_path: login_path.to_string(),
            home_path: home_path.to_string(),
            ..Self::default()
        }
    }

    pub fn with_denied_message(mut self, message: &str) -> Self {
        self.denied_message = message.to_string();
        self
    }

    pub fn check(&self, session: &Session, route: &ResolvedRoute) -> GuardDecision {
        if !route.requires_auth() {
            return GuardDecision::Allow;
        }

        if !session.is_logged_in {
            return GuardDecision::Redirect {
                to: self.login_path.clone(),
                notice: None,
            };
        }

        let roles = route.required_roles();
        if !roles.is_empty() && !session.has_any_role(&roles) {
            return GuardDecision::Redirect {
                to: self.home_path.clone(),
                notice: Some(Notice::error(&self.denied_message)),
            };
        }

        GuardDecision::Allow
    }
}
