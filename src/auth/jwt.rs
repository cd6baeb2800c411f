//! JWT Token Handler
//! Mission: Mint and verify signed, time-bounded bearer tokens

use crate::auth::models::{Claims, IssuedToken};
use crate::clock::{system_clock, SharedClock};
use anyhow::{bail, Context, Result};
use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Why a presented token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidToken {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not verify")]
    BadSignature,
    #[error("token has expired")]
    Expired,
}

/// JWT Handler for token operations
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    default_ttl: Duration,
    clock: SharedClock,
}

impl JwtHandler {
    /// Create a handler signing with `secret` under the HMAC algorithm named
    /// by `algorithm` ("HS256", "HS384" or "HS512").
    pub fn new(secret: &str, algorithm: &str, default_ttl: Duration) -> Result<Self> {
        let algorithm = Algorithm::from_str(algorithm)
            .with_context(|| format!("Unknown signing algorithm {algorithm}"))?;
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            bail!("Signing algorithm {algorithm:?} needs a key pair, only HMAC is supported");
        }
        if default_ttl <= Duration::zero() {
            bail!("Token lifetime must be positive");
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            default_ttl,
            clock: system_clock(),
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Issue a token for `subject` valid for `ttl` (or the default lifetime).
    pub fn issue(&self, subject: &str, ttl: Option<Duration>) -> Result<IssuedToken> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(ttl)
            .context("Invalid timestamp")?;

        let claims = Claims {
            sub: subject.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().simple().to_string(),
        };

        debug!(
            "Generating JWT for {}, expires in {}s",
            subject,
            ttl.num_seconds()
        );

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .context("Failed to generate JWT")?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn decode(&self, token: &str) -> Result<Claims, InvalidToken> {
        // Expiry is checked against our own clock, with no leeway.
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let decoded = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    InvalidToken::BadSignature
                }
                ErrorKind::ExpiredSignature => InvalidToken::Expired,
                _ => InvalidToken::Malformed,
            }
        })?;

        let claims = decoded.claims;
        if claims.exp <= self.clock.now().timestamp() {
            return Err(InvalidToken::Expired);
        }

        debug!("Validated JWT for {}", claims.sub);
        Ok(claims)
    }

    /// Time left before `claims` expire, if any.
    pub fn remaining_ttl(&self, claims: &Claims) -> Option<Duration> {
        let left = claims.expires_at()? - self.clock.now();
        (left > Duration::zero()).then_some(left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use std::sync::Arc;

    const SECRET: &str = "test-secret-key-12345";

    fn handler() -> JwtHandler {
        JwtHandler::new(SECRET, "HS256", Duration::minutes(30)).unwrap()
    }

    fn handler_with_clock(clock: &ManualClock) -> JwtHandler {
        handler().with_clock(Arc::new(clock.clone()))
    }

    #[test]
    fn test_issue_and_decode() {
        let handler = handler();
        let issued = handler.issue("alice", None).unwrap();
        assert!(!issued.token.is_empty());

        let claims = handler.decode(&issued.token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_custom_ttl() {
        let handler = handler();
        let issued = handler.issue("alice", Some(Duration::minutes(5))).unwrap();
        let claims = handler.decode(&issued.token).unwrap();
        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[test]
    fn test_zero_ttl_is_already_expired() {
        let handler = handler();
        let issued = handler.issue("alice", Some(Duration::zero())).unwrap();
        assert_eq!(handler.decode(&issued.token), Err(InvalidToken::Expired));
    }

    #[test]
    fn test_token_expires_on_simulated_clock() {
        let clock = ManualClock::default();
        let handler = handler_with_clock(&clock);
        let issued = handler.issue("alice", Some(Duration::seconds(1))).unwrap();
        assert_eq!(handler.decode(&issued.token).unwrap().sub, "alice");

        clock.advance(Duration::seconds(2));
        assert_eq!(handler.decode(&issued.token), Err(InvalidToken::Expired));
    }

    #[test]
    fn test_invalid_token_rejected() {
        let handler = handler();
        assert_eq!(
            handler.decode("invalid.token.here"),
            Err(InvalidToken::Malformed)
        );
        assert_eq!(handler.decode(""), Err(InvalidToken::Malformed));
    }

    #[test]
    fn test_different_secrets_reject() {
        let handler1 = JwtHandler::new("secret1", "HS256", Duration::minutes(30)).unwrap();
        let handler2 = JwtHandler::new("secret2", "HS256", Duration::minutes(30)).unwrap();

        let issued = handler1.issue("alice", None).unwrap();
        assert_eq!(
            handler2.decode(&issued.token),
            Err(InvalidToken::BadSignature)
        );
    }

    #[test]
    fn test_algorithm_mismatch_rejected() {
        let hs256 = JwtHandler::new(SECRET, "HS256", Duration::minutes(30)).unwrap();
        let hs512 = JwtHandler::new(SECRET, "HS512", Duration::minutes(30)).unwrap();

        let issued = hs512.issue("alice", None).unwrap();
        assert!(hs256.decode(&issued.token).is_err());
        assert_eq!(hs512.decode(&issued.token).unwrap().sub, "alice");
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let handler = handler();
        let issued = handler.issue("alice", None).unwrap();
        let forged = handler.issue("mallory", None).unwrap();

        // alice's header and signature around mallory's payload
        let a: Vec<&str> = issued.token.split('.').collect();
        let m: Vec<&str> = forged.token.split('.').collect();
        let spliced = format!("{}.{}.{}", a[0], m[1], a[2]);
        assert_eq!(handler.decode(&spliced), Err(InvalidToken::BadSignature));
    }

    #[test]
    fn test_tokens_for_same_subject_are_distinct() {
        let handler = handler();
        let first = handler.issue("alice", None).unwrap();
        let second = handler.issue("alice", None).unwrap();
        assert_ne!(first.token, second.token);
    }

    #[test]
    fn test_rejects_asymmetric_and_unknown_algorithms() {
        assert!(JwtHandler::new(SECRET, "RS256", Duration::minutes(30)).is_err());
        assert!(JwtHandler::new(SECRET, "none", Duration::minutes(30)).is_err());
        assert!(JwtHandler::new(SECRET, "HS256", Duration::zero()).is_err());
    }

    #[test]
    fn test_remaining_ttl() {
        let clock = ManualClock::default();
        let handler = handler_with_clock(&clock);
        let issued = handler.issue("alice", Some(Duration::seconds(100))).unwrap();
        let claims = handler.decode(&issued.token).unwrap();

        clock.advance(Duration::seconds(40));
        let left = handler.remaining_ttl(&claims).unwrap();
        assert!(left <= Duration::seconds(60) && left > Duration::seconds(58));

        clock.advance(Duration::seconds(100));
        assert!(handler.remaining_ttl(&claims).is_none());
        assert!(clock.now() > issued.expires_at);
    }
}
