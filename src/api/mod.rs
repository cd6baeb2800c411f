pub mod analytics;
pub mod calculations;
pub mod routes;
pub mod users;
pub mod validate;

pub use routes::{create_router, ApiError, AppState};
