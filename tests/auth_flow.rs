//! Token lifecycle tests for `AuthManager` against a mock backend.

use std::time::{Duration, Instant};

use cellscope_client::{AuthManager, Credentials};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> Credentials {
    Credentials {
        username: "operator".to_string(),
        password: "secret".to_string(),
    }
}

fn manager(base_url: &str) -> AuthManager {
    AuthManager::new(reqwest::Client::new(), base_url, credentials())
}

fn token_response(access: &str, refresh: &str, expires_in: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": expires_in,
    }))
}

async fn mount_login(server: &MockServer, expires_in: u64) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({
            "username": "operator",
            "password": "secret",
        })))
        .respond_with(token_response("tok-a", "ref-a", expires_in))
        .named("login")
        .mount(server)
        .await;
}

#[tokio::test]
async fn login_applies_expiry_margin() {
    let server = MockServer::start().await;
    mount_login(&server, 40).await;

    let mut auth = manager(&server.uri());
    let before = Instant::now();
    auth.login().await.unwrap();
    let after = Instant::now();

    // expires_in of 40s becomes a 20s effective lifetime.
    let session = auth.session().unwrap();
    assert!(session.expires_at() >= before + Duration::from_secs(20));
    assert!(session.expires_at() <= after + Duration::from_secs(20));
    assert!(session.is_valid(Instant::now()));
    assert!(!session.is_valid(after + Duration::from_secs(20)));
}

#[tokio::test]
async fn login_rejected_keeps_prior_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(token_response("tok-a", "ref-a", 3600))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut auth = manager(&server.uri());
    auth.login().await.unwrap();
    let expires_at = auth.session().unwrap().expires_at();

    let error = auth.login().await.unwrap_err();
    assert!(matches!(
        error,
        cellscope_client::AuthError::LoginRejected(status) if status.as_u16() == 401
    ));
    // The prior session is untouched.
    assert_eq!(auth.session().unwrap().expires_at(), expires_at);
}

#[tokio::test]
async fn login_transport_failure_is_typed() {
    // Bind and immediately drop a listener so the port is known-dead.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut auth = manager(&format!("http://127.0.0.1:{port}"));
    let error = auth.login().await.unwrap_err();
    assert!(matches!(error, cellscope_client::AuthError::Transport(_)));
    assert!(auth.session().is_none());
}

#[tokio::test]
async fn ensure_fresh_is_noop_while_token_valid() {
    let server = MockServer::start().await;
    mount_login(&server, 3600).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(token_response("tok-b", "ref-b", 3600))
        .expect(0)
        .named("refresh (must not be called)")
        .mount(&server)
        .await;

    let mut auth = manager(&server.uri());
    auth.login().await.unwrap();
    let expires_at = auth.session().unwrap().expires_at();

    auth.ensure_fresh().await;
    auth.ensure_fresh().await;
    assert_eq!(auth.session().unwrap().expires_at(), expires_at);
}

#[tokio::test]
async fn ensure_fresh_refreshes_expired_token_once() {
    let server = MockServer::start().await;
    // expires_in at the margin: the session counts as expired immediately.
    mount_login(&server, 20).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({ "refresh_token": "ref-a" })))
        .respond_with(token_response("tok-b", "ref-b", 3600))
        .expect(1)
        .named("refresh")
        .mount(&server)
        .await;

    let mut auth = manager(&server.uri());
    auth.login().await.unwrap();
    assert!(!auth.session().unwrap().is_valid(Instant::now()));

    auth.ensure_fresh().await;
    assert!(auth.session().unwrap().is_valid(Instant::now()));

    // The renewed token is valid, so no second network refresh happens
    // (the expect(1) above would trip on server shutdown otherwise).
    auth.ensure_fresh().await;
}

#[tokio::test]
async fn rejected_refresh_keeps_stale_session() {
    let server = MockServer::start().await;
    mount_login(&server, 20).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let mut auth = manager(&server.uri());
    auth.login().await.unwrap();
    let expires_at = auth.session().unwrap().expires_at();

    // The failure is contained: no error surfaces, the stale session stays.
    auth.ensure_fresh().await;
    let session = auth.session().unwrap();
    assert_eq!(session.expires_at(), expires_at);
    assert!(!session.is_valid(Instant::now()));
}

#[tokio::test]
async fn authorize_attaches_bearer_only_with_session() {
    let server = MockServer::start().await;
    mount_login(&server, 3600).await;

    let http = reqwest::Client::new();
    let url = format!("{}/api/image", server.uri());
    let mut auth = manager(&server.uri());

    // Without a session the request goes out untouched.
    let request = auth.authorize(http.get(&url)).build().unwrap();
    assert!(request.headers().get("authorization").is_none());

    auth.login().await.unwrap();
    let request = auth.authorize(http.get(&url)).build().unwrap();
    assert_eq!(
        request.headers().get("authorization").unwrap(),
        "Bearer tok-a"
    );
}
