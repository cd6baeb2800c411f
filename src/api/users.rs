//! Profile management for the authenticated user.

use crate::api::{validate, ApiError, AppState};
use crate::auth::middleware::CurrentUser;
use crate::auth::models::{MessageResponse, UserResponse};
use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// GET /users/profile
pub async fn get_profile(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<UserResponse> {
    Json(UserResponse::from_user(&user))
}

/// PUT /users/profile
///
/// Tokens carry the username as subject, so renaming signs the caller out of
/// every existing session.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(mut user)): Extension<CurrentUser>,
    WithRejection(Json(payload), _): WithRejection<Json<UserUpdate>, ApiError>,
) -> Result<Json<UserResponse>, ApiError> {
    if let Some(username) = payload.username {
        if username != user.username {
            validate::username(&username)?;
            if state.users.find_by_username(&username).await?.is_some() {
                return Err(ApiError::BadRequest("Username already taken".to_string()));
            }
            user.username = username;
        }
    }

    if let Some(email) = payload.email {
        if email != user.email {
            validate::email(&email)?;
            if state.users.find_by_email(&email).await?.is_some() {
                return Err(ApiError::BadRequest("Email already registered".to_string()));
            }
            user.email = email;
        }
    }

    let updated = state
        .users
        .update(&user)
        .await
        .map_err(|e| ApiError::from_user_write(e, "Username already taken"))?;
    Ok(Json(UserResponse::from_user(&updated)))
}

/// POST /users/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(CurrentUser(mut user)): Extension<CurrentUser>,
    WithRejection(Json(payload), _): WithRejection<Json<PasswordChange>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    let hasher = state.gate.hasher();
    if !hasher.verify(&payload.current_password, &user.hashed_password) {
        return Err(ApiError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }
    validate::password(&payload.new_password)?;

    user.hashed_password = hasher.hash(&payload.new_password)?;
    state.users.update(&user).await?;

    info!("🔑 Password changed: {}", user.username);
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// DELETE /users/profile - removes the account and its history
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<StatusCode, ApiError> {
    if !state.users.delete(user.id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    info!("🗑️ Deleted account: {}", user.username);
    Ok(StatusCode::NO_CONTENT)
}
