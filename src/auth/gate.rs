//! Auth Gate
//! Mission: Turn a presented bearer token into a user, or refuse it

use crate::auth::{
    errors::AuthError,
    jwt::JwtHandler,
    models::{IssuedToken, User},
    password::PasswordHasher,
    revocation::RevocationStore,
};
use crate::store::UserRepository;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-request authentication entry point.
///
/// Holds no mutable state of its own; cloning shares the underlying issuer,
/// stores and repository.
#[derive(Clone)]
pub struct AuthGate {
    tokens: Arc<JwtHandler>,
    revocations: Arc<dyn RevocationStore>,
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    store_timeout: Duration,
}

impl AuthGate {
    pub fn new(
        tokens: Arc<JwtHandler>,
        revocations: Arc<dyn RevocationStore>,
        users: Arc<dyn UserRepository>,
        hasher: PasswordHasher,
        store_timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            revocations,
            users,
            hasher,
            store_timeout,
        }
    }

    pub fn hasher(&self) -> PasswordHasher {
        self.hasher
    }

    /// Check revocation, then signature and expiry, then resolve the subject.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let revoked = self
            .with_store_timeout(self.revocations.is_revoked(token))
            .await?;
        if revoked {
            debug!("Rejected revoked token");
            return Err(AuthError::Revoked);
        }

        let claims = self.tokens.decode(token).map_err(|e| {
            debug!("Rejected token: {}", e);
            AuthError::InvalidCredentials
        })?;

        // Unknown subject looks exactly like a bad token.
        self.users
            .find_by_username(&claims.sub)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)
    }

    /// Verify a username/password pair and mint a token for it.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let user = self
            .users
            .find_by_username(username)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let Some(user) = user.filter(|u| self.hasher.verify(password, &u.hashed_password)) else {
            warn!("❌ Failed login attempt: {}", username);
            return Err(AuthError::InvalidCredentials);
        };

        let issued = self
            .tokens
            .issue(&user.username, None)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        info!("✅ Login successful: {}", user.username);
        Ok(issued)
    }

    /// Revoke `token` for whatever lifetime it has left.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let remaining = self
            .tokens
            .decode(token)
            .ok()
            .and_then(|claims| self.tokens.remaining_ttl(&claims));
        if remaining.is_none() {
            debug!("Could not compute remaining token lifetime, using default");
        }

        self.with_store_timeout(self.revocations.revoke(token, remaining))
            .await?;

        info!("👋 Token revoked");
        Ok(())
    }

    async fn with_store_timeout<T>(
        &self,
        op: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, AuthError> {
        match tokio::time::timeout(self.store_timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AuthError::StoreUnavailable(e.to_string())),
            Err(_) => Err(AuthError::StoreUnavailable(format!(
                "no reply within {}ms",
                self.store_timeout.as_millis()
            ))),
        }
    }
}
