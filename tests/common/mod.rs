// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::header;
use axum::response::Response;
use listings_backend::config::Config;
use listings_backend::models::CredentialPair;
use listings_backend::routes::create_router;
use listings_backend::services::{Cipher, TokenManager};
use listings_backend::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{header as header_matcher, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Router plus the fake identity provider and search index behind it.
#[allow(dead_code)]
pub struct TestApp {
    pub app: axum::Router,
    pub state: Arc<AppState>,
    pub provider: MockServer,
    pub index: MockServer,
}

/// Config pointing at the given mock servers.
#[allow(dead_code)]
pub fn test_config(provider: &MockServer, index: &MockServer) -> Config {
    let mut config = Config::test_default();
    config.provider.domain = provider.uri();
    config.search_index_url = index.uri();
    config
}

/// Create a test app backed by fresh mock servers.
#[allow(dead_code)]
pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

/// Create a test app, adjusting the config before the state is built.
#[allow(dead_code)]
pub async fn create_test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let provider = MockServer::start().await;
    let index = MockServer::start().await;

    let mut config = test_config(&provider, &index);
    configure(&mut config);

    let cipher = Cipher::from_base64_key(&config.encryption_key).unwrap();
    let state = Arc::new(AppState::new(config, cipher));

    TestApp {
        app: create_router(state.clone()),
        state,
        provider,
        index,
    }
}

/// Standalone token manager for the given provider.
#[allow(dead_code)]
pub fn token_manager(provider: &MockServer) -> TokenManager {
    let mut config = Config::test_default();
    config.provider.domain = provider.uri();
    let cipher = Cipher::from_base64_key(&config.encryption_key).unwrap();
    TokenManager::new(config.provider, config.cookie, cipher)
}

// ─── Identity provider ───────────────────────────────────────

/// Userinfo answers `email` for `access_token`.
#[allow(dead_code)]
pub async fn mount_userinfo(provider: &MockServer, access_token: &str, email: &str) {
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header_matcher("authorization", format!("Bearer {access_token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "email": email })))
        .mount(provider)
        .await;
}

/// Userinfo answers `status` for `access_token`.
#[allow(dead_code)]
pub async fn mount_userinfo_status(provider: &MockServer, access_token: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header_matcher("authorization", format!("Bearer {access_token}").as_str()))
        .respond_with(ResponseTemplate::new(status))
        .mount(provider)
        .await;
}

// ─── Search index ────────────────────────────────────────────

/// Index document for a user.
#[allow(dead_code)]
pub fn user_doc(id: u64, email: &str, is_active: bool, is_superuser: bool) -> Value {
    let username = email.split('@').next().unwrap_or_default();
    json!({
        "id": format!("user:{id}"),
        "email_s": email,
        "username_s": username,
        "is_active_b": is_active,
        "is_superuser_b": is_superuser,
        "email_ngram_ng": email,
        "_version_": 1
    })
}

/// Select response body with the given page and total.
#[allow(dead_code)]
pub fn select_response(docs: Vec<Value>, num_found: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "responseHeader": { "status": 0 },
        "response": { "numFound": num_found, "start": 0, "docs": docs }
    }))
}

/// Answer the select query `q` with `docs`.
#[allow(dead_code)]
pub async fn mount_select(index: &MockServer, q: &str, docs: Vec<Value>) {
    let total = docs.len() as u64;
    Mock::given(method("GET"))
        .and(path("/listings/select"))
        .and(query_param("q", q))
        .respond_with(select_response(docs, total))
        .mount(index)
        .await;
}

/// Make `email` resolve to the given user document.
#[allow(dead_code)]
pub async fn mount_user(index: &MockServer, doc: Value) {
    let email = doc["email_s"].as_str().unwrap().to_string();
    mount_select(index, &format!("email_s:{email}"), vec![doc]).await;
}

// ─── Cookies ─────────────────────────────────────────────────

/// `Cookie` header value carrying encrypted credentials.
#[allow(dead_code)]
pub fn credentials_cookie(state: &AppState, access_token: &str, refresh_token: Option<&str>) -> String {
    let cookie = state
        .token_manager
        .credentials_cookie(&CredentialPair {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
        })
        .unwrap();
    format!("{}={}", cookie.name(), cookie.value())
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Decrypt the value of a `Set-Cookie` header back into credentials.
#[allow(dead_code)]
pub fn decrypt_set_cookie(state: &AppState, set_cookie: &str) -> CredentialPair {
    let value = set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, value)| value)
        .unwrap();
    let cipher = Cipher::from_base64_key(&state.config.encryption_key).unwrap();
    serde_json::from_str(&cipher.decrypt(value).unwrap()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
