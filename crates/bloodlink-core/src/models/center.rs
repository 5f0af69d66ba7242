//! Donation center domain model with per-blood-group inventory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::{Address, BloodGroup, EntityRef, GeoPoint};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryLine {
    pub blood_group: BloodGroup,
    /// Units on hand. Never negative.
    pub available: u32,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Center {
    pub id: Uuid,
    pub name: String,
    /// The hospital or NGO running the center.
    pub operator: EntityRef,
    pub address: Address,
    pub location: GeoPoint,
    pub operating_hours: Option<String>,
    pub contact_phone: String,
    pub inventory: Vec<InventoryLine>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Center {
    pub fn available(&self, group: BloodGroup) -> u32 {
        self.inventory
            .iter()
            .find(|line| line.blood_group == group)
            .map(|line| line.available)
            .unwrap_or(0)
    }

    pub fn total_units(&self) -> u64 {
        self.inventory.iter().map(|l| u64::from(l.available)).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCenter {
    #[validate(length(min = 2, max = 200))]
    pub name: String,
    #[validate(nested)]
    pub address: Address,
    #[validate(custom(function = "crate::validation::validate_point"))]
    pub location: GeoPoint,
    #[validate(length(max = 200))]
    pub operating_hours: Option<String>,
    #[validate(custom(function = "crate::validation::validate_phone"))]
    pub contact_phone: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InventoryChange {
    pub blood_group: BloodGroup,
    /// Signed delta; the resulting quantity is clamped at zero.
    pub change: i64,
}
