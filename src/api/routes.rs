use axum::{
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::{analytics, calculations, users};
use crate::auth::{api as auth_api, auth_middleware, errors::AuthError, AuthGate};
use crate::middleware::request_logging;
use crate::store::{CalculationRepository, Conflict, UserRepository};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub gate: AuthGate,
    pub users: Arc<dyn UserRepository>,
    pub calculations: Arc<dyn CalculationRepository>,
}

impl AppState {
    pub fn new(
        gate: AuthGate,
        users: Arc<dyn UserRepository>,
        calculations: Arc<dyn CalculationRepository>,
    ) -> Self {
        Self {
            gate,
            users,
            calculations,
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(auth_api::register))
        .route("/auth/login", post(auth_api::login));

    // Everything below needs a live bearer token
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth_api::logout))
        .route("/auth/me", get(auth_api::me))
        .route(
            "/users/profile",
            get(users::get_profile)
                .put(users::update_profile)
                .delete(users::delete_account),
        )
        .route("/users/change-password", post(users::change_password))
        .route(
            "/calculations",
            get(calculations::list_calculations).post(calculations::create_calculation),
        )
        .route(
            "/calculations/:id",
            get(calculations::get_calculation)
                .put(calculations::update_calculation)
                .delete(calculations::delete_calculation),
        )
        .route("/analytics/summary", get(analytics::get_summary))
        .route(
            "/analytics/history",
            get(analytics::get_history).delete(analytics::clear_history),
        )
        .route_layer(middleware::from_fn_with_state(
            state.gate.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ===== Error Handling =====

#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    /// Login rejected; carries its own message
    Unauthorized(String),
    Database(anyhow::Error),
    NotFound(String),
    BadRequest(String),
    /// Request parsed but a field is out of range
    Validation(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Database(err)
    }
}

impl ApiError {
    /// Map a user write that lost a uniqueness race to the matching 400.
    pub fn from_user_write(err: anyhow::Error, username_taken: &str) -> Self {
        match err.downcast_ref::<Conflict>() {
            Some(Conflict::Username) => ApiError::BadRequest(username_taken.to_string()),
            Some(Conflict::Email) => ApiError::BadRequest("Email already registered".to_string()),
            None => ApiError::Database(err),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

// Extractor rejections go through `WithRejection` so every malformed request
// still gets a `{"detail"}` body.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) => ApiError::Validation(rejection.body_text()),
            _ => ApiError::BadRequest(rejection.body_text()),
        }
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Auth(err) => return err.into_response(),
            ApiError::Unauthorized(msg) => {
                return (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, "Bearer")],
                    Json(json!({ "detail": msg })),
                )
                    .into_response()
            }
            ApiError::Database(err) => {
                tracing::error!("Database error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };

        let body = Json(json!({
            "detail": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err = anyhow::anyhow!("Test error");
        let api_err: ApiError = err.into();

        match api_err {
            ApiError::Database(_) => (),
            _ => panic!("Expected Database error"),
        }
    }

    #[test]
    fn test_unique_conflicts_are_bad_requests() {
        match ApiError::from_user_write(Conflict::Username.into(), "Username already taken") {
            ApiError::BadRequest(msg) => assert_eq!(msg, "Username already taken"),
            other => panic!("unexpected {other:?}"),
        }
        match ApiError::from_user_write(
            anyhow::Error::from(Conflict::Email).context("Failed to insert user"),
            "Username already registered",
        ) {
            ApiError::BadRequest(msg) => assert_eq!(msg, "Email already registered"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            ApiError::from_user_write(anyhow::anyhow!("disk I/O error"), "x"),
            ApiError::Database(_)
        ));
    }

    #[test]
    fn test_error_statuses() {
        let cases = [
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                ApiError::Validation("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::Auth(AuthError::Revoked),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::Unauthorized("x".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::Database(anyhow::anyhow!("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
