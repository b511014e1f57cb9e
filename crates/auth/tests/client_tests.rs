mod common;

use std::time::Duration;

use admin_console_auth::{AuthError, AuthEvent, AuthOptions, RefreshPolicy, Session};
use admin_console_http::{ApiRequest, StatusCode};
use common::{drain, jwt, manager, persisted};
use futures_util::future::join_all;
use serde_json::{json, Value};
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn on_unauthorized() -> AuthOptions {
    AuthOptions::default().with_refresh_policy(RefreshPolicy::OnUnauthorized)
}

async fn mount_refresh(server: &MockServer, new_token: &str, delay: Duration, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "access_token": new_token,
                    "refresh_token": "r2",
                    "token_type": "bearer"
                }))
                .set_delay(delay),
        )
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_resent() {
    let mock_server = MockServer::start().await;
    let old_token = jwt("alice", "admin", -60);
    let new_token = jwt("alice", "admin", 900);

    Mock::given(method("GET"))
        .and(path("/api/v1/users/"))
        .and(header("Authorization", format!("Bearer {}", old_token).as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Could not validate credentials"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/"))
        .and(header("Authorization", format!("Bearer {}", new_token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "username": "alice", "role": "admin" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_refresh(&mock_server, &new_token, Duration::ZERO, 1).await;

    let storage = persisted(&old_token, Some("r1"), "alice", "admin");
    let manager = manager(&mock_server, storage, on_unauthorized());
    manager.restore_session();
    let client = manager.authenticated_client();

    let users: Value = client.get_json("/api/v1/users/").await.unwrap();

    assert_eq!(users[0]["username"], "alice");
    assert_eq!(manager.access_token().as_deref(), Some(new_token.as_str()));
    assert!(manager.is_logged_in());
}

#[tokio::test]
async fn test_second_unauthorized_expires_session() {
    let mock_server = MockServer::start().await;
    let new_token = jwt("alice", "admin", 900);

    Mock::given(method("GET"))
        .and(path("/api/v1/settings/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_refresh(&mock_server, &new_token, Duration::ZERO, 1).await;

    let storage = persisted(&jwt("alice", "admin", -60), Some("r1"), "alice", "admin");
    let manager = manager(&mock_server, storage.clone(), on_unauthorized());
    manager.restore_session();
    let mut events = manager.events();
    let client = manager.authenticated_client();

    let result = client.send(ApiRequest::get("/api/v1/settings/")).await;

    assert!(matches!(result, Err(AuthError::UnauthorizedRetryExhausted)));
    assert_eq!(manager.session(), Session::default());
    assert!(storage.is_empty());
    assert_eq!(
        drain(&mut events),
        vec![AuthEvent::TokenRefreshed, AuthEvent::SessionExpired]
    );
}

#[tokio::test]
async fn test_unauthorized_without_refresh_token_expires_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/stats/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let storage = persisted(&jwt("dave", "reviewer", -60), None, "dave", "reviewer");
    let manager = manager(&mock_server, storage, AuthOptions::default());
    manager.restore_session();
    let mut events = manager.events();
    let client = manager.authenticated_client();

    let result = client.send(ApiRequest::get("/api/v1/stats/")).await;

    assert!(matches!(result, Err(AuthError::NoRefreshToken)));
    assert!(!manager.is_logged_in());
    assert_eq!(drain(&mut events), vec![AuthEvent::SessionExpired]);
}

#[tokio::test]
async fn test_token_refreshed_before_every_request() {
    let mock_server = MockServer::start().await;
    let old_token = jwt("alice", "admin", 900);
    let new_token = jwt("alice", "admin", 1800);

    Mock::given(method("GET"))
        .and(path("/api/v1/stats/"))
        .and(header("Authorization", format!("Bearer {}", new_token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total_reviews": 7 })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_refresh(&mock_server, &new_token, Duration::ZERO, 1).await;

    let storage = persisted(&old_token, Some("r1"), "alice", "admin");
    let manager = manager(&mock_server, storage, AuthOptions::default());
    manager.restore_session();

    let stats: Value = manager
        .authenticated_client()
        .get_json("/api/v1/stats/")
        .await
        .unwrap();
    assert_eq!(stats["total_reviews"], 7);
}

#[tokio::test]
async fn test_fresh_token_is_not_refreshed_when_expiring_policy() {
    let mock_server = MockServer::start().await;
    let token = jwt("alice", "admin", 3600);

    Mock::given(method("GET"))
        .and(path("/api/v1/stats/"))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_refresh(&mock_server, &token, Duration::ZERO, 0).await;

    let storage = persisted(&token, Some("r1"), "alice", "admin");
    let options = AuthOptions::default().with_refresh_policy(RefreshPolicy::WhenExpiring {
        leeway: Duration::from_secs(60),
    });
    let manager = manager(&mock_server, storage, options);
    manager.restore_session();

    let response = manager
        .authenticated_client()
        .send(ApiRequest::get("/api/v1/stats/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_auth_endpoints_skip_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token"))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_refresh(&mock_server, "unused", Duration::ZERO, 0).await;

    let storage = persisted(&jwt("alice", "admin", 900), Some("r1"), "alice", "admin");
    let manager = manager(&mock_server, storage, AuthOptions::default());
    manager.restore_session();

    let response = manager
        .authenticated_client()
        .send(ApiRequest::post("/api/v1/auth/token").form(&[("username", "alice")]))
        .await
        .unwrap();

    // a 401 from the identity endpoint is an answer, not a reason to refresh
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(manager.is_logged_in());
}

#[tokio::test]
async fn test_concurrent_unauthorized_requests_share_refresh() {
    let mock_server = MockServer::start().await;
    let old_token = jwt("alice", "admin", -60);
    let new_token = jwt("alice", "admin", 900);

    Mock::given(method("GET"))
        .and(header("Authorization", format!("Bearer {}", old_token).as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(3)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(header("Authorization", format!("Bearer {}", new_token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_refresh(&mock_server, &new_token, Duration::from_millis(300), 1).await;

    let storage = persisted(&old_token, Some("r1"), "alice", "admin");
    let manager = manager(&mock_server, storage, on_unauthorized());
    manager.restore_session();
    let client = manager.authenticated_client();

    let paths = ["/api/v1/datasets/", "/api/v1/raw-datasets/", "/api/v1/legal-articles/"];
    let results = join_all(paths.iter().map(|p| client.get_json::<Value>(p))).await;

    for result in results {
        assert_eq!(result.unwrap()["ok"], true);
    }
}

#[tokio::test]
async fn test_html_error_page_is_transport_fault() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/review/next"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_raw("<!DOCTYPE html><html><body>ERR_NGROK_3200</body></html>", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let storage = persisted(&jwt("alice", "admin", 900), None, "alice", "admin");
    let manager = manager(&mock_server, storage, on_unauthorized());
    manager.restore_session();

    let err = manager
        .authenticated_client()
        .get_json::<Value>("/api/v1/review/next")
        .await
        .unwrap_err();

    assert!(err.is_transport_fault());
    assert!(manager.is_logged_in());
}
