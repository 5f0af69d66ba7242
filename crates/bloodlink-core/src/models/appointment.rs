//! Donation appointment domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::BloodGroup;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

string_enum!(AppointmentStatus {
    Scheduled => "Scheduled",
    Completed => "Completed",
    Cancelled => "Cancelled",
    NoShow => "NoShow",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationAppointment {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub center_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub blood_group: Option<BloodGroup>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAppointment {
    pub center_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub blood_group: Option<BloodGroup>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}
