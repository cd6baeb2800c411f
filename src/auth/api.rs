//! Authentication API Endpoints
//! Mission: Provide register, login, logout and identity endpoints

use crate::api::{validate, ApiError, AppState};
use crate::auth::{
    errors::AuthError,
    middleware::{BearerToken, CurrentUser},
    models::{LoginForm, MessageResponse, NewUser, RegisterRequest, TokenResponse, UserResponse},
};
use axum::{extract::State, http::StatusCode, Extension, Form, Json};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};

/// Register endpoint - POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate::username(&payload.username)?;
    validate::email(&payload.email)?;
    validate::password(&payload.password)?;

    if state.users.find_by_username(&payload.username).await?.is_some() {
        warn!("Registration rejected, username taken: {}", payload.username);
        return Err(ApiError::BadRequest("Username already registered".to_string()));
    }
    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!("Registration rejected, email taken: {}", payload.email);
        return Err(ApiError::BadRequest("Email already registered".to_string()));
    }

    let hashed_password = state.gate.hasher().hash(&payload.password)?;
    let user = state
        .users
        .create(NewUser {
            username: payload.username,
            email: payload.email,
            hashed_password,
        })
        .await
        .map_err(|e| ApiError::from_user_write(e, "Username already registered"))?;

    info!("✅ Registered user: {}", user.username);

    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

/// Login endpoint - POST /auth/login (form-encoded, OAuth2 password grant)
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Form(form), _): WithRejection<Form<LoginForm>, ApiError>,
) -> Result<Json<TokenResponse>, ApiError> {
    info!("🔐 Login attempt: {}", form.username);

    let issued = state
        .gate
        .login(&form.username, &form.password)
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Incorrect username or password".to_string())
            }
            other => other.into(),
        })?;

    Ok(Json(TokenResponse::bearer(issued.token)))
}

/// Logout endpoint - POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.gate.logout(&token).await?;
    info!("👋 Logged out: {}", user.username);
    Ok(Json(MessageResponse::new("Successfully logged out")))
}

/// Get current user info - GET /auth/me
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse::from_user(&user))
}
