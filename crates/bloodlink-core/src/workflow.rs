//! Repository-backed operations on resources and requests.
//!
//! Each operation loads a document, checks that the actor may perform the
//! change, applies the matching [`lifecycle`] function, and saves the
//! document back. Saves are version-checked, so two concurrent
//! transitions on the same document cannot both succeed; the loser gets
//! [`CoreError::VersionConflict`] and nothing is retried here.

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{CoreError, CoreResult};
use crate::lifecycle::{self, TransitionPolicy};
use crate::models::audit::{AuditOutcome, CreateAuditLogEntry};
use crate::models::common::{Actor, Role};
use crate::models::hospital::{Hospital, UpdateHospital};
use crate::models::ngo::{Ngo, UpdateNgo};
use crate::models::request::{
    CreateCommunication, CreateRequest, NewRequest, Request, RequestStatus, RequestWindow,
    StatusChange,
};
use crate::models::resource::{CreateResource, Resource, ResourceDetails, ResourceStatus};
use crate::repository::{
    AuditLogRepository, HospitalRepository, NgoRepository, RequestRepository, ResourceRepository,
};
use crate::validation;

/// Append an audit entry. A failed append is logged, not propagated: the
/// document change it describes has already been committed.
pub(crate) async fn record_audit<A: AuditLogRepository>(
    audit: &A,
    actor: Actor,
    action: String,
    entity_type: &str,
    entity_id: Uuid,
    metadata: serde_json::Value,
) {
    let entry = CreateAuditLogEntry {
        actor_id: actor.id,
        actor_type: actor.role,
        action: action.clone(),
        entity_type: entity_type.to_string(),
        entity_id,
        outcome: AuditOutcome::Success,
        metadata: Some(metadata),
    };
    if let Err(e) = audit.append(entry).await {
        warn!(error = %e, %action, %entity_id, "Failed to append audit entry");
    }
}

fn is_owner(actor: &Actor, resource: &Resource) -> bool {
    actor.is(&resource.owner)
}

/// Hospitals and NGOs approve requests against resources they own;
/// administrators may act on any resource.
fn can_decide(actor: &Actor, resource: &Resource) -> bool {
    actor.is_admin()
        || (matches!(actor.role, Role::Hospital | Role::Ngo) && is_owner(actor, resource))
}

fn is_participant(actor: &Actor, request: &Request, resource: &Resource) -> bool {
    actor.is_admin() || actor.is(&request.requester) || is_owner(actor, resource)
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Move a resource to a new status on behalf of its owner or an admin.
pub async fn change_resource_status<R, A>(
    resources: &R,
    audit: &A,
    actor: Actor,
    resource_id: Uuid,
    new_status: ResourceStatus,
    reason: Option<String>,
) -> CoreResult<Resource>
where
    R: ResourceRepository,
    A: AuditLogRepository,
{
    let mut resource = resources.get_by_id(resource_id).await?;
    if !(actor.is_admin() || is_owner(&actor, &resource)) {
        return Err(CoreError::denied(
            "only the owner or an administrator may change a resource's status",
        ));
    }

    let from = resource.status.current;
    lifecycle::update_resource_status(
        &mut resource,
        new_status,
        Some(actor.id),
        reason.clone(),
        Utc::now(),
    );
    let saved = resources.save(&resource).await?;

    info!(%resource_id, %from, to = %new_status, actor = %actor.id, "Resource status changed");
    record_audit(
        audit,
        actor,
        format!("resource.status.{new_status}"),
        "resource",
        resource_id,
        json!({ "from": from, "to": new_status, "reason": reason }),
    )
    .await;
    Ok(saved)
}

/// Mark a resource as verified. Administrators only.
pub async fn verify_resource<R, A>(
    resources: &R,
    audit: &A,
    actor: Actor,
    resource_id: Uuid,
) -> CoreResult<Resource>
where
    R: ResourceRepository,
    A: AuditLogRepository,
{
    if !actor.is_admin() {
        return Err(CoreError::denied("only administrators may verify resources"));
    }
    let mut resource = resources.get_by_id(resource_id).await?;
    resource.is_verified = true;
    let saved = resources.save(&resource).await?;
    record_audit(
        audit,
        actor,
        "resource.verified".into(),
        "resource",
        resource_id,
        json!({}),
    )
    .await;
    Ok(saved)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// File a new request. The request starts `PENDING` with empty history.
pub async fn submit_request<Q, R>(
    requests: &Q,
    resources: &R,
    actor: Actor,
    input: CreateRequest,
) -> CoreResult<Request>
where
    Q: RequestRepository,
    R: ResourceRepository,
{
    if !matches!(actor.role, Role::Hospital | Role::Ngo) {
        return Err(CoreError::denied("only hospitals and NGOs may file requests"));
    }
    input.validate()?;
    validation::check_window(input.start_date, input.end_date)?;

    let resource = resources.get_by_id(input.resource_id).await?;
    if is_owner(&actor, &resource) {
        return Err(CoreError::validation(
            "resource_id: cannot request a resource you own",
        ));
    }
    if matches!(
        resource.status.current,
        ResourceStatus::Disposed | ResourceStatus::Expired
    ) {
        return Err(CoreError::validation(format!(
            "resource_id: resource is {} and cannot be requested",
            resource.status.current
        )));
    }
    if input.quantity > resource.quantity {
        return Err(CoreError::validation(format!(
            "quantity: only {} unit(s) exist",
            resource.quantity
        )));
    }

    let request = requests
        .create(NewRequest {
            requester: actor.entity_ref(),
            resource_id: resource.id,
            resource_kind: resource.kind(),
            quantity: input.quantity,
            duration: RequestWindow {
                start_date: input.start_date,
                end_date: input.end_date,
            },
            priority: input.priority,
            purpose: input.purpose,
            location: input.location,
        })
        .await?;

    info!(request_id = %request.id, resource_id = %resource.id, requester = %actor.id, "Request submitted");
    Ok(request)
}

fn authorize_transition(
    actor: &Actor,
    request: &Request,
    resource: &Resource,
    target: RequestStatus,
) -> CoreResult<()> {
    let allowed = match target {
        RequestStatus::Approved | RequestStatus::Rejected | RequestStatus::Completed => {
            can_decide(actor, resource)
        }
        RequestStatus::Cancelled => actor.is_admin() || actor.is(&request.requester),
        RequestStatus::Expired => is_participant(actor, request, resource),
        RequestStatus::Pending => actor.is_admin(),
    };
    if allowed {
        Ok(())
    } else {
        Err(CoreError::denied(format!(
            "{} may not move this request to {target}",
            actor.role
        )))
    }
}

/// Move a request through the approval workflow.
///
/// Approval claims `approved_quantity` units of the resource. The claims
/// of all approved requests on a resource may not exceed its quantity;
/// an approval that would overbook it fails with [`CoreError::Conflict`].
/// The resource is saved (and reserved if it was available) before the
/// request, so two concurrent approvals on one resource cannot both pass
/// the capacity check. When a request leaves `APPROVED`, a reserved
/// resource is released once no approved request on it remains.
pub async fn change_request_status<Q, R, A>(
    requests: &Q,
    resources: &R,
    audit: &A,
    actor: Actor,
    request_id: Uuid,
    change: StatusChange,
    policy: TransitionPolicy,
) -> CoreResult<Request>
where
    Q: RequestRepository,
    R: ResourceRepository,
    A: AuditLogRepository,
{
    change.validate()?;
    let mut request = requests.get_by_id(request_id).await?;
    let resource = resources.get_by_id(request.resource_id).await?;
    authorize_transition(&actor, &request, &resource, change.status)?;

    let from = request.status.current;
    let now = Utc::now();
    lifecycle::update_request_status(
        &mut request,
        change.status,
        actor.id,
        actor.role,
        change.reason.clone(),
        now,
        policy,
    )?;

    if change.status == RequestStatus::Approved {
        let approved = change.approved_quantity.unwrap_or(request.quantity.requested);
        if approved == 0 || approved > request.quantity.requested {
            return Err(CoreError::validation(format!(
                "approved_quantity: must be between 1 and {}",
                request.quantity.requested
            )));
        }
        request.quantity.approved = Some(approved);
        if let Some(approval) = request.approval.as_mut() {
            approval.conditions = change.conditions.clone();
        }
    }
    request.updated_at = now;

    let saved = if change.status == RequestStatus::Approved {
        reserve_resource(requests, resources, actor, resource, &request).await?;
        match requests.save(&request).await {
            Ok(saved) => saved,
            Err(e) => {
                release_if_unclaimed(requests, resources, actor, request.resource_id, request_id)
                    .await;
                return Err(e);
            }
        }
    } else {
        let saved = requests.save(&request).await?;
        if from == RequestStatus::Approved {
            release_if_unclaimed(requests, resources, actor, saved.resource_id, request_id).await;
        }
        saved
    };
    info!(%request_id, %from, to = %change.status, actor = %actor.id, "Request status changed");

    record_audit(
        audit,
        actor,
        format!("request.status.{}", change.status.as_str().to_lowercase()),
        "request",
        request_id,
        json!({ "from": from, "to": change.status, "reason": change.reason }),
    )
    .await;
    Ok(saved)
}

/// Units of `resource_id` held by approved requests other than `except`.
async fn claimed_units<Q: RequestRepository>(
    requests: &Q,
    resource_id: Uuid,
    except: Uuid,
) -> CoreResult<u64> {
    let approved = requests
        .list_by_resource_and_status(resource_id, RequestStatus::Approved)
        .await?;
    Ok(approved
        .iter()
        .filter(|r| r.id != except)
        .map(|r| u64::from(r.quantity.approved.unwrap_or(r.quantity.requested)))
        .sum())
}

/// Check capacity for `request` and write the resource back, reserved if
/// it was available. The version-checked save orders concurrent approvals.
async fn reserve_resource<Q, R>(
    requests: &Q,
    resources: &R,
    actor: Actor,
    mut resource: Resource,
    request: &Request,
) -> CoreResult<()>
where
    Q: RequestRepository,
    R: ResourceRepository,
{
    let claimed = claimed_units(requests, resource.id, request.id).await?;
    let wanted = u64::from(request.quantity.approved.unwrap_or(request.quantity.requested));
    if claimed + wanted > u64::from(resource.quantity) {
        return Err(CoreError::conflict(format!(
            "resource {} has {} of {} unit(s) already approved",
            resource.id, claimed, resource.quantity
        )));
    }

    if resource.status.current == ResourceStatus::Available {
        lifecycle::update_resource_status(
            &mut resource,
            ResourceStatus::Reserved,
            Some(actor.id),
            Some(format!("request {} approved", request.id)),
            Utc::now(),
        );
    }
    resources.save(&resource).await?;
    Ok(())
}

/// Return a reserved resource to `available` when no approved request
/// holds it any more. Failures are logged: the request change is already
/// committed.
async fn release_if_unclaimed<Q, R>(
    requests: &Q,
    resources: &R,
    actor: Actor,
    resource_id: Uuid,
    request_id: Uuid,
) where
    Q: RequestRepository,
    R: ResourceRepository,
{
    let result: CoreResult<()> = async {
        let remaining = requests
            .list_by_resource_and_status(resource_id, RequestStatus::Approved)
            .await?;
        if !remaining.is_empty() {
            return Ok(());
        }
        let mut resource = resources.get_by_id(resource_id).await?;
        if resource.status.current != ResourceStatus::Reserved {
            return Ok(());
        }
        lifecycle::update_resource_status(
            &mut resource,
            ResourceStatus::Available,
            Some(actor.id),
            Some(format!("request {request_id} released")),
            Utc::now(),
        );
        resources.save(&resource).await.map(|_| ())
    }
    .await;

    if let Err(e) = result {
        warn!(error = %e, %resource_id, %request_id, "Failed to release resource reservation");
    }
}

/// Fetch a request the actor takes part in.
pub async fn get_request<Q, R>(
    requests: &Q,
    resources: &R,
    actor: Actor,
    request_id: Uuid,
) -> CoreResult<Request>
where
    Q: RequestRepository,
    R: ResourceRepository,
{
    let request = requests.get_by_id(request_id).await?;
    let resource = resources.get_by_id(request.resource_id).await?;
    if !is_participant(&actor, &request, &resource) {
        return Err(CoreError::denied("not a participant in this request"));
    }
    Ok(request)
}

/// Append a message to a request's thread.
pub async fn post_communication<Q, R>(
    requests: &Q,
    resources: &R,
    actor: Actor,
    request_id: Uuid,
    input: CreateCommunication,
) -> CoreResult<Request>
where
    Q: RequestRepository,
    R: ResourceRepository,
{
    input.validate()?;
    let mut request = get_request(requests, resources, actor, request_id).await?;
    let now = Utc::now();
    lifecycle::add_communication(
        &mut request,
        actor.entity_ref(),
        input.message,
        input.attachments,
        now,
    );
    request.updated_at = now;
    requests.save(&request).await
}

/// Pending requests for a resource, most urgent first, oldest first within
/// a priority.
pub async fn find_pending_requests<Q: RequestRepository>(
    requests: &Q,
    resource_id: Uuid,
) -> CoreResult<Vec<Request>> {
    let pending = requests
        .list_by_resource_and_status(resource_id, RequestStatus::Pending)
        .await?;
    Ok(lifecycle::order_pending(pending))
}

/// [`find_pending_requests`] restricted to the resource's owner or an admin.
pub async fn pending_requests_for<Q, R>(
    requests: &Q,
    resources: &R,
    actor: Actor,
    resource_id: Uuid,
) -> CoreResult<Vec<Request>>
where
    Q: RequestRepository,
    R: ResourceRepository,
{
    let resource = resources.get_by_id(resource_id).await?;
    if !(actor.is_admin() || is_owner(&actor, &resource)) {
        return Err(CoreError::denied(
            "only the owner or an administrator may review pending requests",
        ));
    }
    find_pending_requests(requests, resource_id).await
}

/// Register a resource owned by the calling hospital, NGO or donor.
pub async fn create_resource<R: ResourceRepository>(
    resources: &R,
    actor: Actor,
    input: CreateResource,
) -> CoreResult<Resource> {
    if actor.is_admin() {
        return Err(CoreError::denied(
            "administrators cannot own resources",
        ));
    }
    input.validate()?;
    if let ResourceDetails::Medicine { expiry_date, .. } = &input.details {
        if *expiry_date <= Utc::now().date_naive() {
            return Err(CoreError::validation(
                "details.expiry_date: medicine is already expired",
            ));
        }
    }
    let resource = resources.create(actor.entity_ref(), input).await?;
    info!(resource_id = %resource.id, owner = %actor.id, kind = %resource.kind(), "Resource created");
    Ok(resource)
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Mark a hospital's registration as checked. Administrators only.
pub async fn verify_hospital<H, A>(
    hospitals: &H,
    audit: &A,
    actor: Actor,
    hospital_id: Uuid,
) -> CoreResult<Hospital>
where
    H: HospitalRepository,
    A: AuditLogRepository,
{
    if !actor.is_admin() {
        return Err(CoreError::denied("only administrators may verify hospitals"));
    }
    let hospital = hospitals
        .update(
            hospital_id,
            UpdateHospital {
                is_verified: Some(true),
                ..Default::default()
            },
        )
        .await?;
    info!(%hospital_id, admin = %actor.id, "Hospital verified");
    record_audit(audit, actor, "hospital.verified".into(), "hospital", hospital_id, json!({})).await;
    Ok(hospital)
}

/// Mark an NGO's registration as checked. Administrators only.
pub async fn verify_ngo<N, A>(ngos: &N, audit: &A, actor: Actor, ngo_id: Uuid) -> CoreResult<Ngo>
where
    N: NgoRepository,
    A: AuditLogRepository,
{
    if !actor.is_admin() {
        return Err(CoreError::denied("only administrators may verify NGOs"));
    }
    let ngo = ngos
        .update(
            ngo_id,
            UpdateNgo {
                is_verified: Some(true),
                ..Default::default()
            },
        )
        .await?;
    info!(%ngo_id, admin = %actor.id, "NGO verified");
    record_audit(audit, actor, "ngo.verified".into(), "ngo", ngo_id, json!({})).await;
    Ok(ngo)
}
