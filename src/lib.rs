//! Calculator Backend Library
//!
//! Exposes the auth core, storage and HTTP router for the server binary and tests.

pub mod analytics;
pub mod api;
pub mod app;
pub mod auth;
pub mod calculator;
pub mod clock;
pub mod config;
pub mod middleware;
pub mod models;
pub mod store;

pub use api::{create_router, AppState};
pub use app::build_state;
pub use config::Config;
