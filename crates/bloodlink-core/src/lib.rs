//! Bloodlink Core: domain models, validation rules, the request
//! lifecycle, and repository traits shared by every other crate.

#[macro_use]
mod macros;

pub mod dashboard;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod repository;
pub mod scheduling;
pub mod validation;
pub mod workflow;
