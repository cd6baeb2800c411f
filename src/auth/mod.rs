//! Authentication Module
//! Mission: Hash credentials, issue and revoke bearer tokens, guard protected routes

pub mod api;
pub mod errors;
pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod revocation;

pub use errors::AuthError;
pub use gate::AuthGate;
pub use jwt::JwtHandler;
pub use middleware::auth_middleware;
pub use password::{PasswordHasher, PasswordScheme};
pub use revocation::{MemoryRevocationStore, RevocationStore, SqliteRevocationStore};
