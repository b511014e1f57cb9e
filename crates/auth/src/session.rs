//! Session snapshot and change events

use crate::token::Identity;

/// セッション情報
///
/// Snapshots are handed out by value or through a `watch::Receiver`; only
/// the [`SessionManager`](crate::SessionManager) changes the live session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub is_logged_in: bool,
    pub user: Option<Identity>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub is_refreshing: bool,
}

impl Session {
    pub fn role(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.role.as_str())
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.username.as_str())
    }

    /// Whether the user holds one of `roles`
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        match self.role() {
            Some(role) => roles.iter().any(|r| r.as_ref() == role),
            None => false,
        }
    }

    /// Recompute `is_logged_in` from the token and identity
    pub(crate) fn sync_logged_in(&mut self) {
        self.is_logged_in = self.access_token.is_some() && self.user.is_some();
    }
}

/// Session lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Identity),
    TokenRefreshed,
    SignedOut,
    /// The session ended because it could not be renewed; the user should
    /// be sent back to the login screen.
    SessionExpired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logged_in_requires_token_and_user() {
        let mut session = Session {
            access_token: Some("a.b.c".to_string()),
            ..Default::default()
        };
        session.sync_logged_in();
        assert!(!session.is_logged_in);

        session.user = Some(Identity {
            username: "carol".to_string(),
            role: "viewer".to_string(),
        });
        session.sync_logged_in();
        assert!(session.is_logged_in);
        assert!(session.has_any_role(&["viewer", "admin"]));
        assert!(!session.has_any_role(&["admin"]));

        session.access_token = None;
        session.sync_logged_in();
        assert!(!session.is_logged_in);
    }
}
