//! State transitions on in-memory documents.
//!
//! These functions only mutate the value they are given; persisting the
//! result (with its version check) is the caller's job. See
//! [`crate::workflow`] for the repository-backed operations.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::appointment::{AppointmentStatus, DonationAppointment};
use crate::models::center::{Center, InventoryLine};
use crate::models::common::{BloodGroup, EntityRef, Role};
use crate::models::request::{
    ApprovalDetails, Communication, Request, RequestStatus, RequestStatusEntry,
};
use crate::models::resource::{Resource, ResourceStatus, ResourceStatusEntry};

/// Which request transitions are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Only moves listed in [`RequestStatus::can_transition_to`].
    #[default]
    Strict,
    /// Any status may follow any other.
    Permissive,
}

/// Move a resource to `new_status`.
///
/// Appends `{status: <current>, timestamp: <last_updated>, updated_by,
/// reason}` to the history, then sets `current` and `last_updated`. Any
/// status may follow any other.
pub fn update_resource_status(
    resource: &mut Resource,
    new_status: ResourceStatus,
    updated_by: Option<Uuid>,
    reason: Option<String>,
    now: DateTime<Utc>,
) {
    let state = &mut resource.status;
    state.history.push(ResourceStatusEntry {
        status: state.current,
        timestamp: state.last_updated,
        updated_by,
        reason,
    });
    state.current = new_status;
    state.last_updated = now;
}

/// Move a request to `new_status`.
///
/// The state being left is appended to the history before `current` is
/// overwritten. Reaching `APPROVED` replaces any earlier approval details.
pub fn update_request_status(
    request: &mut Request,
    new_status: RequestStatus,
    updated_by: Uuid,
    updater_type: Role,
    reason: Option<String>,
    now: DateTime<Utc>,
    policy: TransitionPolicy,
) -> CoreResult<()> {
    let current = request.status.current;
    if policy == TransitionPolicy::Strict && !current.can_transition_to(new_status) {
        return Err(CoreError::InvalidTransition {
            entity: "request".into(),
            from: current.to_string(),
            to: new_status.to_string(),
        });
    }

    request.status.history.push(RequestStatusEntry {
        status: current,
        timestamp: now,
        updated_by,
        updater_type,
        reason,
    });
    request.status.current = new_status;

    if new_status == RequestStatus::Approved {
        request.approval = Some(ApprovalDetails {
            approved_by: updated_by,
            approver_type: updater_type,
            approved_at: now,
            conditions: None,
        });
    }
    Ok(())
}

/// Append a message to the request's communication thread.
pub fn add_communication(
    request: &mut Request,
    sender: EntityRef,
    message: String,
    attachments: Vec<String>,
    now: DateTime<Utc>,
) {
    request.communications.push(Communication {
        sender,
        message,
        attachments,
        timestamp: now,
    });
}

/// Keep only pending requests, most urgent first; within a priority the
/// oldest request comes first.
pub fn order_pending(mut requests: Vec<Request>) -> Vec<Request> {
    requests.retain(Request::is_pending);
    requests.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    requests
}

/// Apply a signed delta to a blood group's stock, creating the line if it
/// does not exist yet. The result is clamped at zero.
pub fn update_inventory(center: &mut Center, blood_group: BloodGroup, change: i64, now: DateTime<Utc>) {
    let idx = match center
        .inventory
        .iter()
        .position(|line| line.blood_group == blood_group)
    {
        Some(idx) => idx,
        None => {
            center.inventory.push(InventoryLine {
                blood_group,
                available: 0,
                last_updated: now,
            });
            center.inventory.len() - 1
        }
    };

    let line = &mut center.inventory[idx];
    let next = (i64::from(line.available) + change).clamp(0, i64::from(u32::MAX));
    line.available = next as u32;
    line.last_updated = now;
}

/// Only scheduled appointments may change state.
pub fn update_appointment_status(
    appointment: &mut DonationAppointment,
    new_status: AppointmentStatus,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if appointment.status != AppointmentStatus::Scheduled || new_status == AppointmentStatus::Scheduled {
        return Err(CoreError::InvalidTransition {
            entity: "appointment".into(),
            from: appointment.status.to_string(),
            to: new_status.to_string(),
        });
    }
    appointment.status = new_status;
    appointment.updated_at = now;
    Ok(())
}
