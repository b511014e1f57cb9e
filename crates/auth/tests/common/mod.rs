#![allow(dead_code)]

use std::sync::Arc;

use admin_console_auth::{
    AuthEvent, AuthOptions, MemoryStorage, SessionManager, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY,
    USER_KEY,
};
use admin_console_http::{HttpClient, DEFAULT_TIMEOUT};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use tokio::sync::broadcast;
use wiremock::MockServer;

/// Signed access token carrying `sub`, `role` and an expiry `ttl` seconds from now
pub fn jwt(sub: &str, role: &str, ttl: i64) -> String {
    let claims = json!({
        "sub": sub,
        "role": role,
        "exp": chrono::Utc::now().timestamp() + ttl,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap()
}

pub fn manager(server: &MockServer, storage: Arc<MemoryStorage>, options: AuthOptions) -> SessionManager {
    let http = HttpClient::standard(&server.uri(), DEFAULT_TIMEOUT).unwrap();
    SessionManager::new(http, storage, options)
}

/// Storage holding a persisted session for `user` with `role`
pub fn persisted(access_token: &str, refresh_token: Option<&str>, user: &str, role: &str) -> Arc<MemoryStorage> {
    let storage = MemoryStorage::new();
    use admin_console_auth::SessionStorage;
    storage.set_item(ACCESS_TOKEN_KEY, access_token).unwrap();
    if let Some(refresh_token) = refresh_token {
        storage.set_item(REFRESH_TOKEN_KEY, refresh_token).unwrap();
    }
    storage
        .set_item(USER_KEY, &json!({ "username": user, "role": role }).to_string())
        .unwrap();
    Arc::new(storage)
}

pub fn drain(events: &mut broadcast::Receiver<AuthEvent>) -> Vec<AuthEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}
