//! Bloodlink Server: the axum REST API over the Bloodlink domain and
//! its SurrealDB persistence.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod response;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
