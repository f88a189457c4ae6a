pub mod api;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use api::create_router;
pub use auth::{Claims, JwtAuth};
pub use error::{ApiError, Result};
pub use state::AppState;
