//! Bloodlink Auth: password verification, JWT issuance/validation,
//! and refresh-token sessions for donors, hospitals and NGOs.

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use service::{AuthService, LoginInput, LoginOutput};
pub use token::AccessTokenClaims;
