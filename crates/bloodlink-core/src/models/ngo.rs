//! NGO domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::{AccountStatus, Address, GeoPoint};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ngo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub registration_number: String,
    pub address: Address,
    pub location: Option<GeoPoint>,
    pub contact_person: String,
    /// Free-form capability tags (e.g. `blood-bank`, `ambulance`).
    pub facilities: Vec<String>,
    pub is_verified: bool,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateNgo {
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
    #[validate(length(min = 2, max = 100))]
    pub contact_person: String,
    #[serde(default)]
    pub facilities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateNgo {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub contact_person: Option<String>,
    pub facilities: Option<Vec<String>>,
    pub is_verified: Option<bool>,
    pub status: Option<AccountStatus>,
}
