//! End-to-end tests of the request workflow over the SurrealDB
//! repositories.

mod common;

use bloodlink_core::error::CoreError;
use bloodlink_core::lifecycle::TransitionPolicy;
use bloodlink_core::models::common::Actor;
use bloodlink_core::models::request::{
    CreateCommunication, CreateRequest, Priority, Request, RequestStatus, StatusChange,
};
use bloodlink_core::models::resource::ResourceStatus;
use bloodlink_core::models::user::UserRole;
use bloodlink_core::repository::{
    AuditLogFilter, AuditLogRepository, Pagination, ResourceRepository,
};
use bloodlink_core::workflow;
use bloodlink_db::repository::{
    SurrealAuditLogRepository, SurrealRequestRepository, SurrealResourceRepository,
};
use chrono::{Duration, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use uuid::Uuid;

struct Fixture {
    resources: SurrealResourceRepository<Db>,
    requests: SurrealRequestRepository<Db>,
    audit: SurrealAuditLogRepository<Db>,
    owner: Actor,
    requester: Actor,
    admin: Actor,
    db: Surreal<Db>,
}

async fn fixture() -> Fixture {
    let db = common::setup().await;
    Fixture {
        resources: SurrealResourceRepository::new(db.clone()),
        requests: SurrealRequestRepository::new(db.clone()),
        audit: SurrealAuditLogRepository::new(db.clone()),
        owner: common::hospital(&db, "owner@hospital.in").await,
        requester: common::ngo(&db, "needs@ngo.org").await,
        admin: common::user(&db, "root@bloodlink.in", UserRole::Admin).await,
        db,
    }
}

fn create_request(resource_id: Uuid, priority: Priority) -> CreateRequest {
    let start = Utc::now() + Duration::days(1);
    CreateRequest {
        resource_id,
        quantity: 1,
        start_date: start,
        end_date: start + Duration::days(3),
        priority,
        purpose: "Needed for the weekend blood camp".into(),
        location: None,
    }
}

fn change(status: RequestStatus) -> StatusChange {
    StatusChange {
        status,
        reason: Some("ok".into()),
        conditions: None,
        approved_quantity: None,
    }
}

async fn submitted(f: &Fixture) -> Request {
    let resource = f
        .resources
        .create(f.owner.entity_ref(), common::ventilator())
        .await
        .unwrap();
    workflow::submit_request(
        &f.requests,
        &f.resources,
        f.requester,
        create_request(resource.id, Priority::Medium),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn admin_approval_stamps_metadata_and_reserves_resource() {
    let f = fixture().await;
    let request = submitted(&f).await;

    let approved = workflow::change_request_status(
        &f.requests,
        &f.resources,
        &f.audit,
        f.admin,
        request.id,
        change(RequestStatus::Approved),
        TransitionPolicy::Strict,
    )
    .await
    .unwrap();

    assert_eq!(approved.status.current, RequestStatus::Approved);
    assert_eq!(approved.status.history.len(), 1);
    assert_eq!(approved.status.history[0].status, RequestStatus::Pending);
    let approval = approved.approval.as_ref().unwrap();
    assert_eq!(approval.approved_by, f.admin.id);
    assert_eq!(approval.approver_type, f.admin.role);
    assert_eq!(approved.quantity.approved, Some(1));

    let resource = f.resources.get_by_id(request.resource_id).await.unwrap();
    assert_eq!(resource.status.current, ResourceStatus::Reserved);

    let audit = f
        .audit
        .list(
            AuditLogFilter {
                entity_id: Some(request.id),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(audit.total, 1);
    assert_eq!(audit.items[0].action, "request.status.approved");
}

#[tokio::test]
async fn completion_releases_the_reservation() {
    let f = fixture().await;
    let request = submitted(&f).await;

    for status in [RequestStatus::Approved, RequestStatus::Completed] {
        workflow::change_request_status(
            &f.requests,
            &f.resources,
            &f.audit,
            f.owner,
            request.id,
            change(status),
            TransitionPolicy::Strict,
        )
        .await
        .unwrap();
    }

    let resource = f.resources.get_by_id(request.resource_id).await.unwrap();
    assert_eq!(resource.status.current, ResourceStatus::Available);
    assert_eq!(resource.status.history.len(), 2);
}

async fn decide(f: &Fixture, request_id: Uuid, status: RequestStatus) -> Result<Request, CoreError> {
    workflow::change_request_status(
        &f.requests,
        &f.resources,
        &f.audit,
        f.owner,
        request_id,
        change(status),
        TransitionPolicy::Strict,
    )
    .await
}

#[tokio::test]
async fn reservation_is_held_until_the_last_approved_request_ends() {
    let f = fixture().await;
    let first = submitted(&f).await;
    let second = workflow::submit_request(
        &f.requests,
        &f.resources,
        f.requester,
        create_request(first.resource_id, Priority::High),
    )
    .await
    .unwrap();

    decide(&f, first.id, RequestStatus::Approved).await.unwrap();
    decide(&f, second.id, RequestStatus::Approved).await.unwrap();
    decide(&f, first.id, RequestStatus::Completed).await.unwrap();

    let resource = f.resources.get_by_id(first.resource_id).await.unwrap();
    assert_eq!(resource.status.current, ResourceStatus::Reserved);

    decide(&f, second.id, RequestStatus::Cancelled).await.unwrap();
    let resource = f.resources.get_by_id(first.resource_id).await.unwrap();
    assert_eq!(resource.status.current, ResourceStatus::Available);
}

#[tokio::test]
async fn approvals_cannot_overbook_a_resource() {
    let f = fixture().await;
    // The ventilator fixture has two units.
    let first = submitted(&f).await;
    let mut ids = vec![first.id];
    for _ in 0..2 {
        let request = workflow::submit_request(
            &f.requests,
            &f.resources,
            f.requester,
            create_request(first.resource_id, Priority::Medium),
        )
        .await
        .unwrap();
        ids.push(request.id);
    }

    decide(&f, ids[0], RequestStatus::Approved).await.unwrap();
    decide(&f, ids[1], RequestStatus::Approved).await.unwrap();
    let err = decide(&f, ids[2], RequestStatus::Approved).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict { .. }));

    let third = workflow::get_request(&f.requests, &f.resources, f.owner, ids[2])
        .await
        .unwrap();
    assert_eq!(third.status.current, RequestStatus::Pending);
    assert!(third.approval.is_none());

    // Freeing one unit lets the waiting request through.
    decide(&f, ids[0], RequestStatus::Completed).await.unwrap();
    decide(&f, ids[2], RequestStatus::Approved).await.unwrap();
    let resource = f.resources.get_by_id(first.resource_id).await.unwrap();
    assert_eq!(resource.status.current, ResourceStatus::Reserved);
}

#[tokio::test]
async fn requester_cannot_approve_own_request() {
    let f = fixture().await;
    let request = submitted(&f).await;

    let err = workflow::change_request_status(
        &f.requests,
        &f.resources,
        &f.audit,
        f.requester,
        request.id,
        change(RequestStatus::Approved),
        TransitionPolicy::Strict,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoreError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn requester_may_cancel() {
    let f = fixture().await;
    let request = submitted(&f).await;

    let cancelled = workflow::change_request_status(
        &f.requests,
        &f.resources,
        &f.audit,
        f.requester,
        request.id,
        change(RequestStatus::Cancelled),
        TransitionPolicy::Strict,
    )
    .await
    .unwrap();
    assert_eq!(cancelled.status.current, RequestStatus::Cancelled);
}

#[tokio::test]
async fn terminal_requests_reject_further_moves_when_strict() {
    let f = fixture().await;
    let request = submitted(&f).await;

    workflow::change_request_status(
        &f.requests,
        &f.resources,
        &f.audit,
        f.owner,
        request.id,
        change(RequestStatus::Rejected),
        TransitionPolicy::Strict,
    )
    .await
    .unwrap();

    let err = workflow::change_request_status(
        &f.requests,
        &f.resources,
        &f.audit,
        f.owner,
        request.id,
        change(RequestStatus::Approved),
        TransitionPolicy::Strict,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition { .. }));

    let reopened = workflow::change_request_status(
        &f.requests,
        &f.resources,
        &f.audit,
        f.owner,
        request.id,
        change(RequestStatus::Approved),
        TransitionPolicy::Permissive,
    )
    .await
    .unwrap();
    assert_eq!(reopened.status.history.len(), 2);
}

#[tokio::test]
async fn approved_quantity_cannot_exceed_requested() {
    let f = fixture().await;
    let request = submitted(&f).await;

    let err = workflow::change_request_status(
        &f.requests,
        &f.resources,
        &f.audit,
        f.owner,
        request.id,
        StatusChange {
            approved_quantity: Some(5),
            ..change(RequestStatus::Approved)
        },
        TransitionPolicy::Strict,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));

    let untouched = workflow::get_request(&f.requests, &f.resources, f.owner, request.id)
        .await
        .unwrap();
    assert_eq!(untouched.status.current, RequestStatus::Pending);
}

#[tokio::test]
async fn submit_rejects_bad_window_and_own_resource() {
    let f = fixture().await;
    let resource = f
        .resources
        .create(f.owner.entity_ref(), common::ventilator())
        .await
        .unwrap();

    let mut backwards = create_request(resource.id, Priority::Low);
    backwards.end_date = backwards.start_date;
    let err = workflow::submit_request(&f.requests, &f.resources, f.requester, backwards)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));

    let err = workflow::submit_request(
        &f.requests,
        &f.resources,
        f.owner,
        create_request(resource.id, Priority::Low),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));

    let err = workflow::submit_request(
        &f.requests,
        &f.resources,
        f.admin,
        create_request(resource.id, Priority::Low),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoreError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn pending_requests_are_ordered_for_the_owner() {
    let f = fixture().await;
    let resource = f
        .resources
        .create(f.owner.entity_ref(), common::ventilator())
        .await
        .unwrap();
    let second_ngo = common::ngo(&f.db, "second@ngo.org").await;

    let low = workflow::submit_request(
        &f.requests,
        &f.resources,
        f.requester,
        create_request(resource.id, Priority::Low),
    )
    .await
    .unwrap();
    let urgent = workflow::submit_request(
        &f.requests,
        &f.resources,
        second_ngo,
        create_request(resource.id, Priority::Urgent),
    )
    .await
    .unwrap();

    let pending = workflow::pending_requests_for(&f.requests, &f.resources, f.owner, resource.id)
        .await
        .unwrap();
    let ids: Vec<_> = pending.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![urgent.id, low.id]);

    let err = workflow::pending_requests_for(&f.requests, &f.resources, f.requester, resource.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn participants_can_talk_outsiders_cannot() {
    let f = fixture().await;
    let request = submitted(&f).await;
    let outsider = common::ngo(&f.db, "nosy@ngo.org").await;

    let updated = workflow::post_communication(
        &f.requests,
        &f.resources,
        f.owner,
        request.id,
        CreateCommunication {
            message: "Please bring the transfer form.".into(),
            attachments: vec![],
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.communications.len(), 1);
    assert_eq!(updated.communications[0].sender, f.owner.entity_ref());

    let err = workflow::post_communication(
        &f.requests,
        &f.resources,
        outsider,
        request.id,
        CreateCommunication {
            message: "hello".into(),
            attachments: vec![],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoreError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn resource_status_changes_are_owner_only_and_audited() {
    let f = fixture().await;
    let resource = f
        .resources
        .create(f.owner.entity_ref(), common::ventilator())
        .await
        .unwrap();

    let err = workflow::change_resource_status(
        &f.resources,
        &f.audit,
        f.requester,
        resource.id,
        ResourceStatus::Disposed,
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoreError::AuthorizationDenied { .. }));

    let updated = workflow::change_resource_status(
        &f.resources,
        &f.audit,
        f.owner,
        resource.id,
        ResourceStatus::Maintenance,
        Some("filter swap".into()),
    )
    .await
    .unwrap();
    assert_eq!(updated.status.history.len(), 1);
    assert_eq!(updated.status.history[0].updated_by, Some(f.owner.id));

    let verified = workflow::verify_resource(&f.resources, &f.audit, f.admin, resource.id)
        .await
        .unwrap();
    assert!(verified.is_verified);

    let audit = f
        .audit
        .list(
            AuditLogFilter {
                entity_id: Some(resource.id),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(audit.total, 2);
}
