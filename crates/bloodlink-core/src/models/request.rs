//! Resource request domain model: the approval workflow's document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::{EntityRef, GeoPoint, Role};
use super::resource::ResourceKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
    Expired,
}

string_enum!(RequestStatus {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
    Cancelled => "CANCELLED",
    Completed => "COMPLETED",
    Expired => "EXPIRED",
});

impl RequestStatus {
    /// No further transitions are allowed out of a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Rejected
                | RequestStatus::Cancelled
                | RequestStatus::Completed
                | RequestStatus::Expired
        )
    }

    /// The transition table used under the strict policy.
    ///
    /// `PENDING -> APPROVED | REJECTED | CANCELLED | EXPIRED`
    /// `APPROVED -> COMPLETED | CANCELLED | EXPIRED`
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        match self {
            Pending => matches!(next, Approved | Rejected | Cancelled | Expired),
            Approved => matches!(next, Completed | Cancelled | Expired),
            Rejected | Cancelled | Completed | Expired => false,
        }
    }
}

/// Ordered so that `Urgent > High > Medium > Low`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

string_enum!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

/// One entry of the request's append-only status log. `status` is the
/// state that was left; `updated_by` / `updater_type` performed the move.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestStatusEntry {
    pub status: RequestStatus,
    pub timestamp: DateTime<Utc>,
    pub updated_by: Uuid,
    pub updater_type: Role,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestStatusState {
    pub current: RequestStatus,
    pub history: Vec<RequestStatusEntry>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestWindow {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestQuantity {
    pub requested: u32,
    pub approved: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovalDetails {
    pub approved_by: Uuid,
    pub approver_type: Role,
    pub approved_at: DateTime<Utc>,
    pub conditions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Communication {
    pub sender: EntityRef,
    pub message: String,
    /// Attachment URLs.
    pub attachments: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    pub requester: EntityRef,
    pub resource_id: Uuid,
    pub resource_kind: ResourceKind,
    pub quantity: RequestQuantity,
    pub duration: RequestWindow,
    pub status: RequestStatusState,
    pub priority: Priority,
    pub purpose: String,
    pub location: Option<GeoPoint>,
    pub approval: Option<ApprovalDetails>,
    pub communications: Vec<Communication>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    pub fn is_pending(&self) -> bool {
        self.status.current == RequestStatus::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRequest {
    pub resource_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub priority: Priority,
    #[validate(length(min = 10, max = 500))]
    pub purpose: String,
    #[validate(custom(function = "crate::validation::validate_point"))]
    pub location: Option<GeoPoint>,
}

/// A validated request ready for insertion, with server-side fields fixed.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub requester: EntityRef,
    pub resource_id: Uuid,
    pub resource_kind: ResourceKind,
    pub quantity: u32,
    pub duration: RequestWindow,
    pub priority: Priority,
    pub purpose: String,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StatusChange {
    pub status: RequestStatus,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    /// Only meaningful when approving.
    #[validate(length(max = 1000))]
    pub conditions: Option<String>,
    /// Only meaningful when approving; defaults to the requested quantity.
    pub approved_quantity: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCommunication {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    #[serde(default)]
    #[validate(length(max = 10))]
    pub attachments: Vec<String>,
}
