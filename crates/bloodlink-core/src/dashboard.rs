//! Read-only aggregates for the per-account dashboards.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::appointment::DonationAppointment;
use crate::models::common::EntityRef;
use crate::models::request::RequestStatus;
use crate::repository::{
    AppointmentRepository, CenterRepository, DonationRepository, Pagination, RequestRepository,
    ResourceRepository, UserRepository,
};
use crate::scheduling::{is_eligible, DONATION_INTERVAL_DAYS};

/// Overview for a hospital or NGO.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OwnerSummary {
    pub resources_total: u64,
    pub resources_by_status: BTreeMap<String, u64>,
    pub requests_by_status: BTreeMap<String, u64>,
    pub incoming_pending: u64,
    pub centers: u64,
    pub inventory_units: u64,
}

pub async fn owner_summary<R, Q, C>(
    resources: &R,
    requests: &Q,
    centers: &C,
    owner: EntityRef,
) -> CoreResult<OwnerSummary>
where
    R: ResourceRepository,
    Q: RequestRepository,
    C: CenterRepository,
{
    let mut summary = OwnerSummary::default();

    for (status, total) in resources.count_by_status(owner).await? {
        summary.resources_total += total;
        summary.resources_by_status.insert(status.to_string(), total);
    }

    for (status, total) in requests.count_by_requester_status(owner).await? {
        summary.requests_by_status.insert(status.to_string(), total);
    }

    summary.incoming_pending = requests
        .count_incoming(owner, RequestStatus::Pending)
        .await?;

    for center in centers.list_by_operator(owner).await? {
        summary.centers += 1;
        summary.inventory_units += center.total_units();
    }
    Ok(summary)
}

/// Overview for a donor.
#[derive(Debug, Clone, Serialize)]
pub struct DonorSummary {
    pub upcoming_appointments: Vec<DonationAppointment>,
    pub donation_count: u64,
    pub last_donation_date: Option<DateTime<Utc>>,
    pub eligible_to_donate: bool,
    pub next_eligible_date: Option<DateTime<Utc>>,
}

pub async fn donor_summary<U, P, D>(
    users: &U,
    appointments: &P,
    donations: &D,
    donor_id: Uuid,
) -> CoreResult<DonorSummary>
where
    U: UserRepository,
    P: AppointmentRepository,
    D: DonationRepository,
{
    let donor = users.get_by_id(donor_id).await?;
    let now = Utc::now();

    let upcoming_appointments = appointments.list_upcoming_by_donor(donor_id, now).await?;

    let donation_count = donations
        .list_by_donor(donor_id, Pagination { offset: 0, limit: 1 })
        .await?
        .total;

    let last = donor.last_donation_date;
    let eligible_to_donate = is_eligible(last, now);
    let next_eligible_date = match last {
        Some(last) if !eligible_to_donate => Some(last + Duration::days(DONATION_INTERVAL_DAYS)),
        _ => None,
    };

    Ok(DonorSummary {
        upcoming_appointments,
        donation_count,
        last_donation_date: last,
        eligible_to_donate,
        next_eligible_date,
    })
}
