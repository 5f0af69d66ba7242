//! Hospital domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::{AccountStatus, Address, GeoPoint};

/// A hospital account. Hospitals own resources, operate donation centers,
/// and both file and approve resource requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hospital {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Government registration / licence number.
    pub registration_number: String,
    pub address: Address,
    pub location: Option<GeoPoint>,
    pub specialities: Vec<String>,
    pub emergency_contact: Option<String>,
    /// Set by an administrator once the registration has been checked.
    pub is_verified: bool,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateHospital {
    #[validate(length(min = 2, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "crate::validation::validate_phone"))]
    pub phone: String,
    pub password: String,
    #[validate(length(min = 3, max = 50))]
    pub registration_number: String,
    #[validate(nested)]
    pub address: Address,
    #[validate(custom(function = "crate::validation::validate_point"))]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub specialities: Vec<String>,
    #[validate(custom(function = "crate::validation::validate_phone"))]
    pub emergency_contact: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateHospital {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub specialities: Option<Vec<String>>,
    pub is_verified: Option<bool>,
    pub status: Option<AccountStatus>,
}
