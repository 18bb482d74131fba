// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login, callback and logout flow tests.
//!
//! These tests verify that:
//! 1. Login redirects to the provider's authorize endpoint
//! 2. The callback creates first-time users and sets the encrypted cookie
//! 3. Any callback failure lands on the frontend error page
//! 4. A callback that failed to index the user succeeds when retried
//! 5. Logout revokes the token and clears the cookie

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

async fn mount_code_exchange(provider: &MockServer) {
    mount_code_exchanges(provider, 1).await;
}

/// Code `abc` is exchanged exactly `times` times.
async fn mount_code_exchanges(provider: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "at", "refresh_token": "rt"})),
        )
        .expect(times)
        .mount(provider)
        .await;
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_login_redirects_to_provider() {
    let test = common::create_test_app().await;

    let response = test
        .app
        .oneshot(Request::get("/users/login").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = location(&response);
    assert!(location.starts_with(&format!("{}/authorize?", test.provider.uri())));
    assert!(location.contains("scope=openid%20email%20offline_access"));
    assert!(location.contains("state=swagger"));
}

#[tokio::test]
async fn test_callback_creates_new_user() {
    let test = common::create_test_app().await;
    mount_code_exchange(&test.provider).await;
    common::mount_userinfo(&test.provider, "at", "New.User@Example.com").await;
    common::mount_select(&test.index, "email_s:new.user@example.com", vec![]).await;
    Mock::given(method("POST"))
        .and(path("/listings/update"))
        .and(query_param("commit", "true"))
        .and(body_json(json!([{
            "id": "user:1",
            "email_s": "new.user@example.com",
            "username_s": "new.user",
            "is_active_b": true,
            "is_superuser_b": false,
            "email_ngram_ng": "new.user@example.com"
        }])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&test.index)
        .await;

    let response = test
        .app
        .oneshot(
            Request::get("/users/login-callback?code=abc&state=frontend")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "http://localhost:3000/my-listings");

    let cookie = common::find_cookie(&common::set_cookie_headers(&response), "credentials");
    let credentials = common::decrypt_set_cookie(&test.state, &cookie);
    assert_eq!(credentials.access_token, "at");
    assert_eq!(credentials.refresh_token.as_deref(), Some("rt"));

    let user = test.state.store.get_user(1).unwrap();
    assert_eq!(user.username, "new.user");
    assert!(user.is_active);
}

#[tokio::test]
async fn test_callback_existing_user_swagger_state() {
    let test = common::create_test_app().await;
    mount_code_exchange(&test.provider).await;
    common::mount_userinfo(&test.provider, "at", "sam@example.com").await;
    common::mount_user(&test.index, common::user_doc(4, "sam@example.com", true, false)).await;
    Mock::given(method("POST"))
        .and(path("/listings/update"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test.index)
        .await;

    let response = test
        .app
        .oneshot(
            Request::get("/users/login-callback?code=abc&state=swagger")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/swagger");
    common::find_cookie(&common::set_cookie_headers(&response), "credentials");
    assert!(test.state.store.get_user(1).is_none());
}

#[tokio::test]
async fn test_callback_retry_after_index_failure_signs_in() {
    let test = common::create_test_app().await;
    mount_code_exchanges(&test.provider, 2).await;
    common::mount_userinfo(&test.provider, "at", "sam@example.com").await;
    common::mount_select(&test.index, "email_s:sam@example.com", vec![]).await;
    // First index write fails, later ones succeed.
    Mock::given(method("POST"))
        .and(path("/listings/update"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&test.index)
        .await;
    Mock::given(method("POST"))
        .and(path("/listings/update"))
        .and(body_string_contains("\"id\":\"user:1\""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&test.index)
        .await;

    let callback = || {
        Request::get("/users/login-callback?code=abc&state=frontend")
            .body(Body::empty())
            .unwrap()
    };

    let response = test.app.clone().oneshot(callback()).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "http://localhost:3000/error");
    assert!(common::set_cookie_headers(&response).is_empty());
    // The record survives the failed index write.
    assert!(test.state.store.get_user(1).is_some());

    let response = test.app.oneshot(callback()).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "http://localhost:3000/my-listings");
    let cookie = common::find_cookie(&common::set_cookie_headers(&response), "credentials");
    assert_eq!(common::decrypt_set_cookie(&test.state, &cookie).access_token, "at");

    let user = test.state.store.get_user(1).unwrap();
    assert_eq!(user.email, "sam@example.com");
    assert!(test.state.store.get_user(2).is_none());
    assert_eq!(test.state.store.users().len(), 1);
}

#[tokio::test]
async fn test_callback_without_code_goes_to_error_page() {
    let test = common::create_test_app().await;

    let response = test
        .app
        .oneshot(
            Request::get("/users/login-callback?state=swagger")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "http://localhost:3000/error");
    assert!(common::set_cookie_headers(&response).is_empty());
}

#[tokio::test]
async fn test_callback_exchange_failure_goes_to_error_page() {
    let test = common::create_test_app().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&test.provider)
        .await;

    let response = test
        .app
        .oneshot(
            Request::get("/users/login-callback?code=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "http://localhost:3000/error");
    assert!(common::set_cookie_headers(&response).is_empty());
}

#[tokio::test]
async fn test_logout_revokes_and_clears_cookie() {
    let test = common::create_test_app().await;
    Mock::given(method("POST"))
        .and(path("/oauth/revoke"))
        .and(body_string_contains("token=at"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&test.provider)
        .await;

    let response = test
        .app
        .oneshot(
            Request::post("/users/logout")
                .header(header::COOKIE, common::credentials_cookie(&test.state, "at", Some("rt")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = common::find_cookie(&common::set_cookie_headers(&response), "credentials");
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("Path=/"));
}

#[tokio::test]
async fn test_logout_without_credentials() {
    let test = common::create_test_app().await;
    Mock::given(method("POST"))
        .and(path("/oauth/revoke"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test.provider)
        .await;

    let response = test
        .app
        .oneshot(Request::post("/users/logout").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_revocation_failure_is_bad_gateway() {
    let test = common::create_test_app().await;
    Mock::given(method("POST"))
        .and(path("/oauth/revoke"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&test.provider)
        .await;

    let response = test
        .app
        .oneshot(
            Request::post("/users/logout")
                .header(header::AUTHORIZATION, "Bearer at")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = common::body_json(response).await;
    assert_eq!(body["code"], "provider_error");
}
