//! User domain model (donors and platform administrators).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::{AccountStatus, Address, BloodGroup, GeoPoint, Role};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserRole {
    Donor,
    Admin,
}

string_enum!(UserRole {
    Donor => "Donor",
    Admin => "Admin",
});

impl From<UserRole> for Role {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Donor => Role::Donor,
            UserRole::Admin => Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Argon2id PHC string. Never leaves the server.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub blood_group: Option<BloodGroup>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<Address>,
    pub location: Option<GeoPoint>,
    pub status: AccountStatus,
    pub last_donation_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "crate::validation::validate_phone"))]
    pub phone: String,
    /// Raw password (hashed with Argon2id before storage).
    pub password: String,
    #[serde(default = "default_role")]
    pub role: UserRole,
    pub blood_group: Option<BloodGroup>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(nested)]
    pub address: Option<Address>,
    #[validate(custom(function = "crate::validation::validate_point"))]
    pub location: Option<GeoPoint>,
}

fn default_role() -> UserRole {
    UserRole::Donor
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub status: Option<AccountStatus>,
    pub blood_group: Option<BloodGroup>,
    pub last_donation_date: Option<DateTime<Utc>>,
}
