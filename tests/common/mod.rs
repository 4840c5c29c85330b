// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use rep_tracker::config::Config;
use rep_tracker::db::CounterStore;
use rep_tracker::routes::create_router;
use rep_tracker::services::GoogleIdTokenVerifier;
use rep_tracker::AppState;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_KID: &str = "test-key-1";
const PRIVATE_KEY_PEM: &[u8] = include_bytes!("../fixtures/google_test_key.pem");
const PUBLIC_KEY_PEM: &[u8] = include_bytes!("../fixtures/google_test_key.pub.pem");

/// Router plus the state and data directory behind it.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub dir: TempDir,
}

/// Claims of a Google-style ID token.
#[derive(Serialize, Clone)]
#[allow(dead_code)]
pub struct IdClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub exp: u64,
    pub iat: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[allow(dead_code)]
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Valid claims for `sub` addressed to the test client id.
#[allow(dead_code)]
pub fn claims_for(sub: &str, name: &str) -> IdClaims {
    let now = now_secs();
    IdClaims {
        iss: "https://accounts.google.com".to_string(),
        aud: Config::test_default().google_client_id,
        sub: sub.to_string(),
        exp: now + 3600,
        iat: now,
        name: Some(name.to_string()),
        email: Some(format!("{sub}@example.com")),
    }
}

/// Sign `claims` with the fixture RSA key.
#[allow(dead_code)]
pub fn mint_id_token(claims: &IdClaims) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY_PEM).unwrap();
    encode(&header, claims, &key).unwrap()
}

#[allow(dead_code)]
pub fn test_verifier(client_id: &str) -> GoogleIdTokenVerifier {
    let key = DecodingKey::from_rsa_pem(PUBLIC_KEY_PEM).unwrap();
    GoogleIdTokenVerifier::with_static_key(client_id, TEST_KID, key).unwrap()
}

/// Test config with a data file under `dir` and a rate limit high enough not
/// to interfere.
#[allow(dead_code)]
pub fn test_config(dir: &TempDir) -> Config {
    Config {
        data_file: dir.path().join("data.json"),
        rate_limit_max: 10_000,
        ..Config::test_default()
    }
}

/// Create a test app backed by a fresh temporary data file.
#[allow(dead_code)]
pub async fn create_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    create_test_app_with(config, dir).await
}

#[allow(dead_code)]
pub async fn create_test_app_with(config: Config, dir: TempDir) -> TestApp {
    let store = CounterStore::open(config.data_file.clone(), config.dedup_window)
        .await
        .unwrap();
    let verifier = Arc::new(test_verifier(&config.google_client_id));
    let state = Arc::new(AppState::new(config, store, verifier));

    TestApp {
        router: create_router(state.clone()),
        state,
        dir,
    }
}

/// POST a JSON body, optionally with a `Cookie` header.
#[allow(dead_code)]
pub fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `session=<token>` taken from a response's `Set-Cookie` header.
#[allow(dead_code)]
pub fn session_cookie_from(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .and_then(|v| v.split(';').next())
        .filter(|pair| *pair != "session=")
        .map(str::to_string)
}

/// Sign in as `sub` and return the `Cookie` header value for the session.
#[allow(dead_code)]
pub async fn sign_in(app: &TestApp, sub: &str, name: &str) -> String {
    let token = mint_id_token(&claims_for(sub, name));
    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/verify-token",
            serde_json::json!({ "credential": token }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 200, "sign-in failed");
    session_cookie_from(&response).expect("session cookie")
}
