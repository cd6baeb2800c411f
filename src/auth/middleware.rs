//! Authentication Middleware
//! Mission: Protect API endpoints by running every bearer token through the gate

use crate::auth::{errors::AuthError, gate::AuthGate, models::User};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

/// Identity resolved for the current request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Raw token the current request authenticated with
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

/// Auth middleware that validates bearer tokens
pub async fn auth_middleware(
    State(gate): State<AuthGate>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AuthError::MissingToken)?;
    let token = bearer.token().to_string();

    let user = gate.authenticate(&token).await?;

    // Handlers pick these up through `Extension`
    req.extensions_mut().insert(CurrentUser(user));
    req.extensions_mut().insert(BearerToken(token));

    Ok(next.run(req).await)
}
