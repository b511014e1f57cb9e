//! User administration endpoints (admin role required by the server)

use admin_console_auth::AuthenticatedClient;
use admin_console_http::ApiRequest;
use serde::{Deserialize, Serialize};

use crate::error::Result;

const USERS_PATH: &str = "/api/v1/users/";

/// An account as listed by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub role: String,
    pub password: String,
}

impl NewUser {
    pub fn new(username: &str, role: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            role: role.to_string(),
            password: password.to_string(),
        }
    }
}

pub struct UsersApi {
    api: AuthenticatedClient,
}

impl UsersApi {
    pub fn new(api: AuthenticatedClient) -> Self {
        Self { api }
    }

    /// List accounts, paging with `skip` and `limit`
    pub async fn list_users(&self, skip: u32, limit: u32) -> Result<Vec<User>> {
        let request = ApiRequest::get(USERS_PATH)
            .query("skip", skip)
            .query("limit", limit);
        Ok(self.api.execute(request).await?)
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User> {
        Ok(self.api.post_json(USERS_PATH, user).await?)
    }
}
