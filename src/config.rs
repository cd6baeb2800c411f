//! Server configuration, read from flags or the environment (after `.env`).

use crate::auth::PasswordScheme;
use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::time::Duration;

pub const DEV_SECRET_KEY: &str = "dev-secret-key-change-in-production";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RevocationBackend {
    /// Process-local; revocations are lost on restart
    Memory,
    /// Shared SQLite table; survives restarts
    Sqlite,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "calc-server")]
#[command(about = "Calculator API with token authentication and history analytics")]
pub struct Config {
    /// HMAC secret used to sign access tokens
    #[arg(long, env = "SECRET_KEY", default_value = DEV_SECRET_KEY, hide_env_values = true)]
    pub secret_key: String,

    /// Signing algorithm (HS256, HS384 or HS512)
    #[arg(long, env = "ALGORITHM", default_value = "HS256")]
    pub algorithm: String,

    /// Access token lifetime in minutes
    #[arg(long, env = "ACCESS_TOKEN_EXPIRE_MINUTES", default_value = "30")]
    pub access_token_expire_minutes: i64,

    /// SQLite file for users and calculations
    #[arg(long, env = "DATABASE_PATH", default_value = "calculator.db")]
    pub database_path: String,

    #[arg(long, env = "REVOCATION_BACKEND", value_enum, default_value = "memory")]
    pub revocation_backend: RevocationBackend,

    /// SQLite file for revoked tokens (sqlite backend only)
    #[arg(long, env = "REVOCATION_DB_PATH", default_value = "revocations.db")]
    pub revocation_db_path: String,

    /// Upper bound on a single revocation store call
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value = "2000")]
    pub store_timeout_ms: u64,

    /// Digest for newly stored passwords: sha256 or bcrypt
    #[arg(long, env = "PASSWORD_SCHEME", default_value = "sha256")]
    pub password_scheme: String,

    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: String,
}

impl Config {
    pub fn token_ttl(&self) -> Result<chrono::Duration> {
        if self.access_token_expire_minutes <= 0 {
            bail!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be positive, got {}",
                self.access_token_expire_minutes
            );
        }
        chrono::Duration::try_minutes(self.access_token_expire_minutes)
            .ok_or_else(|| anyhow::anyhow!("ACCESS_TOKEN_EXPIRE_MINUTES out of range"))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn password_scheme(&self) -> Result<PasswordScheme> {
        PasswordScheme::from_str(&self.password_scheme).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown PASSWORD_SCHEME '{}' (expected sha256 or bcrypt)",
                self.password_scheme
            )
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.secret_key == DEV_SECRET_KEY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["calc-server"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_explicit_flags() {
        let config = parse(&[
            "--secret-key",
            "s3cret",
            "--access-token-expire-minutes",
            "5",
            "--revocation-backend",
            "sqlite",
            "--password-scheme",
            "bcrypt",
        ]);
        assert_eq!(config.secret_key, "s3cret");
        assert_eq!(config.token_ttl().unwrap(), chrono::Duration::minutes(5));
        assert_eq!(config.revocation_backend, RevocationBackend::Sqlite);
        assert!(matches!(
            config.password_scheme().unwrap(),
            PasswordScheme::Bcrypt { .. }
        ));
        assert!(!config.uses_dev_secret());
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = parse(&["--access-token-expire-minutes", "0"]);
        assert!(config.token_ttl().is_err());

        let config = parse(&["--password-scheme", "md5"]);
        assert!(config.password_scheme().is_err());

        assert!(Config::try_parse_from(["calc-server", "--revocation-backend", "redis"]).is_err());
    }
}
