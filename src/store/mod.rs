//! Persistence
//! Mission: Hide user and calculation storage behind repository traits

pub mod sqlite;

use crate::auth::models::{NewUser, User};
use crate::models::{Calculation, CalculationStats, HistoryFilter, NewCalculation};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

pub use sqlite::SqliteStore;

/// A write lost a race for a unique account field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("username already exists")]
    Username,
    #[error("email already exists")]
    Email,
}

/// User accounts. Usernames and emails are unique.
///
/// `create` and `update` fail with a [`Conflict`] (inside the `anyhow::Error`)
/// when a unique field is already taken.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn create(&self, user: NewUser) -> Result<User>;

    /// Persist username, email and password of `user`; bumps `updated_at`.
    async fn update(&self, user: &User) -> Result<User>;

    /// Remove the user and everything they own. Returns false if absent.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Calculation history, always scoped to one user.
#[async_trait]
pub trait CalculationRepository: Send + Sync {
    async fn insert(&self, calc: NewCalculation) -> Result<Calculation>;

    async fn get(&self, user_id: i64, id: i64) -> Result<Option<Calculation>>;

    /// Newest first.
    async fn list(&self, user_id: i64, skip: i64, limit: i64) -> Result<Vec<Calculation>>;

    async fn update(&self, calc: &Calculation) -> Result<()>;

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool>;

    /// Filtered page, newest first, plus the unpaginated match count.
    async fn history(&self, user_id: i64, filter: &HistoryFilter)
        -> Result<(Vec<Calculation>, i64)>;

    async fn stats(&self, user_id: i64) -> Result<CalculationStats>;

    async fn delete_all(&self, user_id: i64) -> Result<usize>;
}
