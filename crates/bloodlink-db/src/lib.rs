//! Bloodlink Database: SurrealDB connection management, schema
//! migrations, and repository implementations for the `bloodlink-core`
//! traits.

mod connection;
mod error;
mod password;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use password::hash_password;
pub use schema::{run_migrations, schema_v1};
