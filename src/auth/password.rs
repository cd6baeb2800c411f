//! Credential Hasher
//! Mission: Turn plaintext passwords into stored digests and check them

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Hex-encoded SHA-256 of the plaintext.
///
/// Unsalted and fast. Kept as the default digest format so existing
/// credentials keep verifying; select [`PasswordScheme::Bcrypt`] for new
/// deployments.
pub fn hash_password(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// Recompute the digest of `plaintext` and compare it with `digest`.
pub fn verify_password(plaintext: &str, digest: &str) -> bool {
    hash_password(plaintext) == digest
}

/// Digest format used for newly stored passwords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordScheme {
    Sha256,
    Bcrypt { cost: u32 },
}

impl PasswordScheme {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sha256" => Some(PasswordScheme::Sha256),
            "bcrypt" => Some(PasswordScheme::Bcrypt {
                cost: bcrypt::DEFAULT_COST,
            }),
            _ => None,
        }
    }
}

/// Hashes with the configured scheme, verifies against either format.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    scheme: PasswordScheme,
}

impl PasswordHasher {
    pub fn new(scheme: PasswordScheme) -> Self {
        Self { scheme }
    }

    pub fn hash(&self, plaintext: &str) -> Result<String> {
        match self.scheme {
            PasswordScheme::Sha256 => Ok(hash_password(plaintext)),
            PasswordScheme::Bcrypt { cost } => {
                bcrypt::hash(plaintext, cost).context("Failed to hash password")
            }
        }
    }

    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        if is_bcrypt_digest(digest) {
            return match bcrypt::verify(plaintext, digest) {
                Ok(valid) => valid,
                Err(e) => {
                    warn!("Unreadable bcrypt digest: {}", e);
                    false
                }
            };
        }
        verify_password(plaintext, digest)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(PasswordScheme::Sha256)
    }
}

fn is_bcrypt_digest(digest: &str) -> bool {
    digest.starts_with("$2")
}
