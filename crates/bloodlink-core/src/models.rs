//! Domain models for Bloodlink.
//!
//! These are the core types shared across all crates. Each entity module
//! follows the same shape: the stored entity, a `Create*` input validated
//! at the model layer, and (where the entity is mutable) an `Update*` input.

pub mod appointment;
pub mod audit;
pub mod center;
pub mod common;
pub mod donation;
pub mod hospital;
pub mod ngo;
pub mod request;
pub mod resource;
pub mod session;
pub mod user;
