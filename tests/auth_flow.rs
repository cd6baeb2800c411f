//! End-to-end authentication flow through the HTTP router.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use common::test_app;
use serde_json::json;

#[tokio::test]
async fn register_login_me_logout() {
    let app = test_app();

    let (status, body) = app.register("alice", "alice@example.com", "secret123").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
    assert!(body.get("hashed_password").is_none());

    let (status, body) = app.login("alice", "secret123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, body) = app.json(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");

    let (status, body) = app
        .json(Method::POST, "/auth/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully logged out");

    // Signature and expiry are still fine; revocation alone rejects it
    let (status, body) = app.json(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Token has been revoked");
}

#[tokio::test]
async fn logout_leaves_other_sessions_alone() {
    let app = test_app();
    let first = app.signed_in("bob").await;
    let (_, body) = app.login("bob", "secret123").await;
    let second = body["access_token"].as_str().unwrap().to_string();
    assert_ne!(first, second);

    app.json(Method::POST, "/auth/logout", Some(&first), None).await;

    let (status, _) = app.json(Method::GET, "/auth/me", Some(&second), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_and_garbage_tokens_are_rejected() {
    let app = test_app();

    let (status, body) = app.json(Method::GET, "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Not authenticated");

    let (status, body) = app
        .json(Method::GET, "/calculations", Some("not.a.jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Could not validate credentials");
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = test_app();
    let token = app.signed_in("carol").await;

    app.clock.advance(Duration::minutes(29));
    let (status, _) = app.json(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    app.clock.advance(Duration::minutes(2));
    let (status, _) = app.json(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let app = test_app();
    app.register("dave", "dave@example.com", "secret123").await;

    let (status, wrong) = app.login("dave", "nope-nope").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, unknown) = app.login("nobody", "secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(wrong["detail"], "Incorrect username or password");
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn duplicate_registration_and_validation() {
    let app = test_app();
    app.register("erin", "erin@example.com", "secret123").await;

    let (status, body) = app.register("erin", "other@example.com", "secret123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Username already registered");

    let (status, body) = app.register("erin2", "erin@example.com", "secret123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email already registered");

    let (status, _) = app.register("ab", "ab@example.com", "secret123").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.register("frank", "frank@example.com", "123").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn profile_update_and_password_change() {
    let app = test_app();
    let token = app.signed_in("grace").await;
    app.register("heidi", "heidi@example.com", "secret123").await;

    let (status, body) = app
        .json(
            Method::PUT,
            "/users/profile",
            Some(&token),
            Some(json!({ "email": "heidi@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email already registered");

    let (status, body) = app
        .json(
            Method::PUT,
            "/users/profile",
            Some(&token),
            Some(json!({ "email": "grace@new.example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "grace@new.example.com");

    let (status, body) = app
        .json(
            Method::POST,
            "/users/change-password",
            Some(&token),
            Some(json!({ "current_password": "wrong", "new_password": "newsecret" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Current password is incorrect");

    let (status, body) = app
        .json(
            Method::POST,
            "/users/change-password",
            Some(&token),
            Some(json!({ "current_password": "secret123", "new_password": "newsecret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password changed successfully");

    let (status, _) = app.login("grace", "secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.login("grace", "newsecret").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn renaming_invalidates_old_tokens() {
    let app = test_app();
    let token = app.signed_in("ivan").await;

    let (status, body) = app
        .json(
            Method::PUT,
            "/users/profile",
            Some(&token),
            Some(json!({ "username": "ivan_the_second" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ivan_the_second");

    let (status, _) = app.json(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleted_account_cannot_authenticate() {
    let app = test_app();
    let token = app.signed_in("judy").await;

    let (status, _) = app
        .json(Method::DELETE, "/users/profile", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.json(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.login("judy", "secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_needs_no_token() {
    let app = test_app();
    let (status, body) = app.json(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn incomplete_login_form_gets_json_detail() {
    let app = test_app();
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(axum::body::Body::from("username=alice"))
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());

    let (status, body) = app
        .json(Method::POST, "/auth/register", None, Some(json!({ "username": "x" })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}
