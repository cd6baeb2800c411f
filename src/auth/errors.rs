//! Auth error types
//! Mission: Collapse every authentication failure into a small, non-leaky set

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad username/password, bad or expired token, or a token whose user
    /// no longer exists. One message for all of them.
    #[error("Could not validate credentials")]
    InvalidCredentials,
    #[error("Token has been revoked")]
    Revoked,
    #[error("Not authenticated")]
    MissingToken,
    #[error("Revocation store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::Revoked | AuthError::MissingToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            AuthError::StoreUnavailable(reason) => {
                error!(reason = %reason, "Revocation store unavailable, denying request");
                "Authentication service unavailable".to_string()
            }
            AuthError::Internal(reason) => {
                error!(reason = %reason, "Authentication failed internally");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({ "detail": detail }));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
