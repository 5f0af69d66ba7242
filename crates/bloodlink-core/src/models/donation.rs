//! Recorded blood donation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::BloodGroup;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodDonation {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub center_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub blood_group: BloodGroup,
    pub units: u32,
    pub donated_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDonation {
    pub donor_id: Uuid,
    pub center_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub blood_group: BloodGroup,
    #[validate(range(min = 1, max = 4))]
    pub units: u32,
    /// Defaults to the time of recording.
    pub donated_at: Option<DateTime<Utc>>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}
