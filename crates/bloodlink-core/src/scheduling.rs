//! Donation centers, appointments and recorded donations.

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{CoreError, CoreResult};
use crate::lifecycle;
use crate::models::appointment::{AppointmentStatus, CreateAppointment, DonationAppointment};
use crate::models::center::{Center, CreateCenter, InventoryChange};
use crate::models::common::{Actor, BloodGroup, EntityType, GeoPoint, Role};
use crate::models::donation::{BloodDonation, CreateDonation};
use crate::models::user::{UpdateUser, UserRole};
use crate::repository::{
    AppointmentRepository, AuditLogRepository, CenterRepository, DonationRepository,
    UserRepository,
};
use crate::workflow::record_audit;

/// Minimum gap between two whole-blood donations.
pub const DONATION_INTERVAL_DAYS: i64 = 90;

/// Upper bound on a nearby-center search radius.
pub const MAX_SEARCH_RADIUS_KM: f64 = 500.0;

fn operates(actor: &Actor, center: &Center) -> bool {
    actor.is(&center.operator)
}

pub async fn create_center<C: CenterRepository>(
    centers: &C,
    actor: Actor,
    input: CreateCenter,
) -> CoreResult<Center> {
    if !matches!(actor.role.entity_type(), EntityType::Hospital | EntityType::Ngo) {
        return Err(CoreError::denied("only hospitals and NGOs operate centers"));
    }
    input.validate()?;
    let center = centers.create(actor.entity_ref(), input).await?;
    info!(center_id = %center.id, operator = %actor.id, "Center created");
    Ok(center)
}

/// Apply a signed stock change to one blood group of a center.
pub async fn adjust_inventory<C, A>(
    centers: &C,
    audit: &A,
    actor: Actor,
    center_id: Uuid,
    change: InventoryChange,
) -> CoreResult<Center>
where
    C: CenterRepository,
    A: AuditLogRepository,
{
    let mut center = centers.get_by_id(center_id).await?;
    if !(actor.is_admin() || operates(&actor, &center)) {
        return Err(CoreError::denied(
            "only the operator or an administrator may adjust inventory",
        ));
    }
    let now = Utc::now();
    lifecycle::update_inventory(&mut center, change.blood_group, change.change, now);
    center.updated_at = now;
    let saved = centers.save(&center).await?;

    record_audit(
        audit,
        actor,
        "center.inventory.adjusted".into(),
        "center",
        center_id,
        json!({
            "blood_group": change.blood_group,
            "change": change.change,
            "available": saved.available(change.blood_group),
        }),
    )
    .await;
    Ok(saved)
}

/// A center together with its distance from the search origin.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyCenter {
    #[serde(flatten)]
    pub center: Center,
    pub distance_km: f64,
}

/// Centers within `radius_km` of `origin`, closest first.
pub async fn find_nearby_centers<C: CenterRepository>(
    centers: &C,
    origin: GeoPoint,
    radius_km: f64,
) -> CoreResult<Vec<NearbyCenter>> {
    crate::validation::validate_point(&origin)
        .map_err(|_| CoreError::validation("coordinates out of range"))?;
    if !(radius_km > 0.0 && radius_km <= MAX_SEARCH_RADIUS_KM) {
        return Err(CoreError::validation(format!(
            "radius: must be greater than 0 and at most {MAX_SEARCH_RADIUS_KM} km"
        )));
    }

    let mut nearby: Vec<NearbyCenter> = centers
        .list_within(origin.bounds_within(radius_km))
        .await?
        .into_iter()
        .filter_map(|center| {
            let distance_km = origin.distance_km(&center.location);
            (distance_km <= radius_km).then_some(NearbyCenter {
                center,
                distance_km,
            })
        })
        .collect();
    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    Ok(nearby)
}

pub async fn book_appointment<P, C>(
    appointments: &P,
    centers: &C,
    actor: Actor,
    input: CreateAppointment,
) -> CoreResult<DonationAppointment>
where
    P: AppointmentRepository,
    C: CenterRepository,
{
    if actor.role != Role::Donor {
        return Err(CoreError::denied("only donors may book appointments"));
    }
    input.validate()?;
    if input.scheduled_at <= Utc::now() {
        return Err(CoreError::validation(
            "scheduled_at: must be in the future",
        ));
    }
    // The center must exist.
    centers.get_by_id(input.center_id).await?;

    let appointment = appointments.create(actor.id, input).await?;
    info!(appointment_id = %appointment.id, donor = %actor.id, "Appointment booked");
    Ok(appointment)
}

/// Donors may cancel their own appointments; the center's operator (or an
/// admin) may mark any outcome.
pub async fn change_appointment_status<P, C>(
    appointments: &P,
    centers: &C,
    actor: Actor,
    appointment_id: Uuid,
    new_status: AppointmentStatus,
) -> CoreResult<DonationAppointment>
where
    P: AppointmentRepository,
    C: CenterRepository,
{
    let mut appointment = appointments.get_by_id(appointment_id).await?;
    let allowed = if actor.is_admin() {
        true
    } else if actor.role == Role::Donor {
        appointment.donor_id == actor.id && new_status == AppointmentStatus::Cancelled
    } else {
        let center = centers.get_by_id(appointment.center_id).await?;
        operates(&actor, &center)
    };
    if !allowed {
        return Err(CoreError::denied(format!(
            "{} may not mark this appointment {new_status}",
            actor.role
        )));
    }

    lifecycle::update_appointment_status(&mut appointment, new_status, Utc::now())?;
    let saved = appointments.save(&appointment).await?;
    info!(%appointment_id, status = %new_status, actor = %actor.id, "Appointment status changed");
    Ok(saved)
}

/// Record a donation at a center.
///
/// Adds the units to the center's stock, completes the linked appointment
/// and stamps the donor's last donation date.
pub async fn record_donation<D, C, P, U, A>(
    donations: &D,
    centers: &C,
    appointments: &P,
    users: &U,
    audit: &A,
    actor: Actor,
    input: CreateDonation,
) -> CoreResult<BloodDonation>
where
    D: DonationRepository,
    C: CenterRepository,
    P: AppointmentRepository,
    U: UserRepository,
    A: AuditLogRepository,
{
    input.validate()?;
    let mut center = centers.get_by_id(input.center_id).await?;
    if !(actor.is_admin() || operates(&actor, &center)) {
        return Err(CoreError::denied(
            "only the operator or an administrator may record donations",
        ));
    }
    let donor = users.get_by_id(input.donor_id).await?;
    if donor.role != UserRole::Donor {
        return Err(CoreError::validation("donor_id: account is not a donor"));
    }

    let now = Utc::now();
    let donated_at = input.donated_at.unwrap_or(now);
    if donated_at > now {
        return Err(CoreError::validation("donated_at: cannot be in the future"));
    }

    let mut appointment = match input.appointment_id {
        Some(id) => {
            let appointment = appointments.get_by_id(id).await?;
            if appointment.donor_id != donor.id || appointment.center_id != center.id {
                return Err(CoreError::validation(
                    "appointment_id: appointment belongs to another donor or center",
                ));
            }
            if appointment.status != AppointmentStatus::Scheduled {
                return Err(CoreError::validation(format!(
                    "appointment_id: appointment is {} and cannot take a donation",
                    appointment.status
                )));
            }
            Some(appointment)
        }
        None => None,
    };

    // Stock first: a stale center fails here, before anything is written.
    let units = input.units;
    let blood_group = input.blood_group;
    lifecycle::update_inventory(&mut center, blood_group, i64::from(units), now);
    center.updated_at = now;
    let center = centers.save(&center).await?;

    let donation = match donations.create(input).await {
        Ok(donation) => donation,
        Err(e) => {
            revert_inventory(centers, center, blood_group, units).await;
            return Err(e);
        }
    };

    if let Some(appointment) = appointment.as_mut() {
        lifecycle::update_appointment_status(appointment, AppointmentStatus::Completed, now)?;
        if let Err(e) = appointments.save(appointment).await {
            warn!(error = %e, appointment_id = %appointment.id, "Failed to complete appointment");
        }
    }

    let newer = donor
        .last_donation_date
        .is_none_or(|previous| previous < donated_at);
    if newer {
        users
            .update(
                donor.id,
                UpdateUser {
                    last_donation_date: Some(donated_at),
                    ..Default::default()
                },
            )
            .await?;
    }

    info!(donation_id = %donation.id, donor = %donor.id, center = %center.id, units, "Donation recorded");
    record_audit(
        audit,
        actor,
        "donation.recorded".into(),
        "donation",
        donation.id,
        json!({ "center_id": center.id, "donor_id": donor.id, "units": units, "blood_group": blood_group }),
    )
    .await;
    Ok(donation)
}

/// Take back units added for a donation that could not be stored.
async fn revert_inventory<C: CenterRepository>(
    centers: &C,
    mut center: Center,
    blood_group: BloodGroup,
    units: u32,
) {
    let now = Utc::now();
    lifecycle::update_inventory(&mut center, blood_group, -i64::from(units), now);
    center.updated_at = now;
    if let Err(e) = centers.save(&center).await {
        warn!(error = %e, center_id = %center.id, units, "Failed to revert inventory for unrecorded donation");
    }
}

/// Whether a donor who last gave blood at `last` may donate again at `now`.
pub fn is_eligible(
    last: Option<chrono::DateTime<Utc>>,
    now: chrono::DateTime<Utc>,
) -> bool {
    last.is_none_or(|last| now - last >= Duration::days(DONATION_INTERVAL_DAYS))
}
