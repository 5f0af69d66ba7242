//! Shareable resource domain model (equipment and medicine).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::{EntityRef, GeoPoint};

/// The variant tag stored alongside a resource and on requests against it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Equipment,
    Medicine,
}

string_enum!(ResourceKind {
    Equipment => "equipment",
    Medicine => "medicine",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Available,
    InUse,
    Maintenance,
    Disposed,
    Expired,
    Reserved,
}

string_enum!(ResourceStatus {
    Available => "available",
    InUse => "in_use",
    Maintenance => "maintenance",
    Disposed => "disposed",
    Expired => "expired",
    Reserved => "reserved",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentCondition {
    New,
    Good,
    Fair,
    Poor,
}

/// Variant-specific attributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceDetails {
    Equipment {
        category: String,
        manufacturer: Option<String>,
        model: Option<String>,
        serial_number: Option<String>,
        condition: EquipmentCondition,
    },
    Medicine {
        generic_name: String,
        dosage_form: Option<String>,
        strength: Option<String>,
        batch_number: Option<String>,
        expiry_date: NaiveDate,
        requires_cold_storage: bool,
    },
}

impl ResourceDetails {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceDetails::Equipment { .. } => ResourceKind::Equipment,
            ResourceDetails::Medicine { .. } => ResourceKind::Medicine,
        }
    }
}

/// One entry of the append-only status log.
///
/// `status` and `timestamp` describe the state being *left*: the value of
/// `current` and `last_updated` immediately before the transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceStatusEntry {
    pub status: ResourceStatus,
    pub timestamp: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceStatusState {
    pub current: ResourceStatus,
    pub history: Vec<ResourceStatusEntry>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner: EntityRef,
    pub details: ResourceDetails,
    pub quantity: u32,
    pub location: Option<GeoPoint>,
    pub status: ResourceStatusState,
    pub is_verified: bool,
    /// Optimistic concurrency counter, bumped on every save.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        self.details.kind()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateResource {
    #[validate(length(min = 2, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub details: ResourceDetails,
    #[validate(range(min = 1))]
    pub quantity: u32,
    #[validate(custom(function = "crate::validation::validate_point"))]
    pub location: Option<GeoPoint>,
}

/// List filters for resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    pub kind: Option<ResourceKind>,
    pub status: Option<ResourceStatus>,
    pub owner: Option<EntityRef>,
    pub verified_only: bool,
}
