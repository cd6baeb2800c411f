#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use calc_backend::{
    auth::{AuthGate, JwtHandler, MemoryRevocationStore, PasswordHasher},
    clock::{ManualClock, SharedClock},
    create_router,
    store::SqliteStore,
    AppState,
};
use chrono::Duration;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub clock: ManualClock,
}

pub fn test_app() -> TestApp {
    let clock = ManualClock::default();
    let shared: SharedClock = Arc::new(clock.clone());
    let ttl = Duration::minutes(30);

    let tokens = JwtHandler::new("integration-secret", "HS256", ttl)
        .unwrap()
        .with_clock(shared.clone());
    let revocations = MemoryRevocationStore::new(ttl).with_clock(shared);
    let store = Arc::new(SqliteStore::in_memory().unwrap());

    let gate = AuthGate::new(
        Arc::new(tokens),
        Arc::new(revocations),
        store.clone(),
        PasswordHasher::default(),
        std::time::Duration::from_millis(500),
    );

    TestApp {
        router: create_router(AppState::new(gate, store.clone(), store)),
        clock,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> (StatusCode, Value) {
        self.json(
            Method::POST,
            "/auth/register",
            None,
            Some(serde_json::json!({
                "username": username,
                "email": email,
                "password": password,
            })),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={username}&password={password}")))
            .unwrap();
        self.send(request).await
    }

    /// Register and log in, returning the bearer token.
    pub async fn signed_in(&self, username: &str) -> String {
        let (status, _) = self
            .register(username, &format!("{username}@example.com"), "secret123")
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = self.login(username, "secret123").await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }
}
