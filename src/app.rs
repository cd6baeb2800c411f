//! Wiring: turn a [`Config`] into shared application state.

use crate::api::AppState;
use crate::auth::{
    AuthGate, JwtHandler, MemoryRevocationStore, PasswordHasher, RevocationStore,
    SqliteRevocationStore,
};
use crate::config::{Config, RevocationBackend};
use crate::store::SqliteStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

pub fn build_state(config: &Config) -> Result<AppState> {
    let ttl = config.token_ttl()?;
    if config.uses_dev_secret() {
        warn!("⚠️ SECRET_KEY not set, signing tokens with the development key");
    }

    let tokens = Arc::new(
        JwtHandler::new(&config.secret_key, &config.algorithm, ttl)
            .context("Invalid token configuration")?,
    );

    let revocations: Arc<dyn RevocationStore> = match config.revocation_backend {
        RevocationBackend::Memory => Arc::new(MemoryRevocationStore::new(ttl)),
        RevocationBackend::Sqlite => Arc::new(
            SqliteRevocationStore::new(&config.revocation_db_path, ttl)
                .context("Failed to open revocation store")?,
        ),
    };
    info!("🔐 Revocation store: {:?}", config.revocation_backend);

    let store = Arc::new(SqliteStore::new(&config.database_path)?);
    let hasher = PasswordHasher::new(config.password_scheme()?);

    let gate = AuthGate::new(
        tokens,
        revocations,
        store.clone(),
        hasher,
        config.store_timeout(),
    );

    Ok(AppState::new(gate, store.clone(), store))
}
