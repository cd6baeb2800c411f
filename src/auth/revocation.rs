//! Token Revocation Store
//! Mission: Remember logged-out tokens until they would have expired anyway

use crate::clock::{system_clock, SharedClock};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Key-value blacklist of revoked tokens with per-entry expiry.
///
/// Absence of a marker, including after its TTL ran out, means the token is
/// not revoked. Revoking a token that already has a live marker leaves the
/// existing marker untouched.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Mark `token` revoked for `ttl`, or the store's default lifetime.
    async fn revoke(&self, token: &str, ttl: Option<Duration>) -> Result<()>;

    async fn is_revoked(&self, token: &str) -> Result<bool>;
}

/// Process-local store. Expired markers are dropped lazily.
pub struct MemoryRevocationStore {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
    default_ttl: Duration,
    clock: SharedClock,
}

impl MemoryRevocationStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Live markers.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries.lock().values().filter(|exp| **exp > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, token: &str, ttl: Option<Duration>) -> Result<()> {
        let now = self.clock.now();
        let expires_at = now + ttl.unwrap_or(self.default_ttl);

        let mut entries = self.entries.lock();
        entries.retain(|_, exp| *exp > now);
        entries.entry(token.to_string()).or_insert(expires_at);
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.get(token).copied() {
            Some(exp) if exp > now => Ok(true),
            Some(_) => {
                entries.remove(token);
                Ok(false)
            }
            None => Ok(false),
        }
    }
}

/// SQLite-backed store that survives restarts.
///
/// Statements run on the blocking pool, so a caller's timeout can abandon a
/// call stuck behind a database lock.
#[derive(Clone)]
pub struct SqliteRevocationStore {
    conn: Arc<Mutex<Connection>>,
    default_ttl: Duration,
    clock: SharedClock,
}

impl SqliteRevocationStore {
    pub fn new(db_path: &str, default_ttl: Duration) -> Result<Self> {
        let conn = Connection::open(db_path).context("open revocation db")?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS revoked_tokens (
                token TEXT PRIMARY KEY,
                expires_at INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_revoked_tokens_expires ON revoked_tokens(expires_at)",
            [],
        )?;

        info!("🔐 Revocation store ready at {}", db_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            default_ttl,
            clock: system_clock(),
        })
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl RevocationStore for SqliteRevocationStore {
    async fn revoke(&self, token: &str, ttl: Option<Duration>) -> Result<()> {
        let now = self.clock.now().timestamp_millis();
        let expires_at = now + ttl.unwrap_or(self.default_ttl).num_milliseconds();
        let conn = self.conn.clone();
        let token = token.to_string();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = conn.lock();
            let purged = conn.execute(
                "DELETE FROM revoked_tokens WHERE expires_at <= ?1",
                params![now],
            )?;
            if purged > 0 {
                debug!("Purged {} expired revocation markers", purged);
            }
            conn.execute(
                "INSERT INTO revoked_tokens (token, expires_at) VALUES (?1, ?2)
                 ON CONFLICT(token) DO NOTHING",
                params![token, expires_at],
            )
            .context("Failed to record revoked token")?;
            Ok(())
        })
        .await
        .context("Revocation write task failed")?
    }

    async fn is_revoked(&self, token: &str) -> Result<bool> {
        let now = self.clock.now().timestamp_millis();
        let conn = self.conn.clone();
        let token = token.to_string();

        tokio::task::spawn_blocking(move || -> Result<bool> {
            let hit: Option<i64> = conn
                .lock()
                .query_row(
                    "SELECT 1 FROM revoked_tokens WHERE token = ?1 AND expires_at > ?2",
                    params![token, now],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(hit.is_some())
        })
        .await
        .context("Revocation lookup task failed")?
    }
}
