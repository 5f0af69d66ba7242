//! Integration tests for the resource and request repositories.

mod common;

use bloodlink_core::error::CoreError;
use bloodlink_core::lifecycle;
use bloodlink_core::models::common::{EntityRef, EntityType};
use bloodlink_core::models::request::{NewRequest, Priority, RequestStatus, RequestWindow};
use bloodlink_core::models::resource::{ResourceFilter, ResourceKind, ResourceStatus};
use bloodlink_core::repository::{Pagination, RequestRepository, ResourceRepository};
use bloodlink_db::repository::{SurrealRequestRepository, SurrealResourceRepository};
use chrono::{Duration, Utc};
use uuid::Uuid;

fn new_request(requester: EntityRef, resource_id: Uuid, priority: Priority) -> NewRequest {
    let start = Utc::now() + Duration::days(1);
    NewRequest {
        requester,
        resource_id,
        resource_kind: ResourceKind::Equipment,
        quantity: 1,
        duration: RequestWindow {
            start_date: start,
            end_date: start + Duration::days(5),
        },
        priority,
        purpose: "Post-operative ventilation support".into(),
        location: None,
    }
}

#[tokio::test]
async fn create_and_get_resource() {
    let db = common::setup().await;
    let owner = common::hospital(&db, "owner@hospital.in").await;
    let repo = SurrealResourceRepository::new(db);

    let created = repo
        .create(owner.entity_ref(), common::ventilator())
        .await
        .unwrap();
    assert_eq!(created.status.current, ResourceStatus::Available);
    assert!(created.status.history.is_empty());
    assert_eq!(created.version, 0);

    let fetched = repo.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched.owner, owner.entity_ref());
    assert_eq!(fetched.kind(), ResourceKind::Equipment);
    assert_eq!(fetched.details, created.details);
    assert_eq!(fetched.quantity, 2);
}

#[tokio::test]
async fn save_persists_history_and_bumps_version() {
    let db = common::setup().await;
    let owner = common::hospital(&db, "owner@hospital.in").await;
    let repo = SurrealResourceRepository::new(db);
    let mut resource = repo
        .create(owner.entity_ref(), common::ventilator())
        .await
        .unwrap();

    lifecycle::update_resource_status(
        &mut resource,
        ResourceStatus::Maintenance,
        Some(owner.id),
        Some("annual service".into()),
        Utc::now(),
    );
    let saved = repo.save(&resource).await.unwrap();
    assert_eq!(saved.version, 1);

    let fetched = repo.get_by_id(resource.id).await.unwrap();
    assert_eq!(fetched.version, 1);
    assert_eq!(fetched.status.current, ResourceStatus::Maintenance);
    assert_eq!(fetched.status.history.len(), 1);
    assert_eq!(fetched.status.history[0].status, ResourceStatus::Available);
    assert_eq!(
        fetched.status.history[0].reason.as_deref(),
        Some("annual service")
    );
}

#[tokio::test]
async fn stale_save_is_a_version_conflict() {
    let db = common::setup().await;
    let owner = common::hospital(&db, "owner@hospital.in").await;
    let repo = SurrealResourceRepository::new(db);
    let created = repo
        .create(owner.entity_ref(), common::ventilator())
        .await
        .unwrap();

    let mut first = created.clone();
    let mut second = created;
    lifecycle::update_resource_status(&mut first, ResourceStatus::InUse, None, None, Utc::now());
    lifecycle::update_resource_status(
        &mut second,
        ResourceStatus::Disposed,
        None,
        None,
        Utc::now(),
    );

    repo.save(&first).await.unwrap();
    let err = repo.save(&second).await.unwrap_err();
    assert!(matches!(err, CoreError::VersionConflict { .. }), "got {err:?}");

    let stored = repo.get_by_id(first.id).await.unwrap();
    assert_eq!(stored.status.current, ResourceStatus::InUse);
    assert_eq!(stored.status.history.len(), 1);
}

#[tokio::test]
async fn save_of_missing_resource_is_not_found() {
    let db = common::setup().await;
    let owner = common::hospital(&db, "owner@hospital.in").await;
    let repo = SurrealResourceRepository::new(db);
    let mut ghost = repo
        .create(owner.entity_ref(), common::ventilator())
        .await
        .unwrap();
    ghost.id = Uuid::new_v4();

    let err = repo.save(&ghost).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn list_resources_with_filters() {
    let db = common::setup().await;
    let hospital = common::hospital(&db, "a@hospital.in").await;
    let ngo = common::ngo(&db, "b@ngo.org").await;
    let repo = SurrealResourceRepository::new(db);

    repo.create(hospital.entity_ref(), common::ventilator())
        .await
        .unwrap();
    let mut theirs = repo
        .create(ngo.entity_ref(), common::ventilator())
        .await
        .unwrap();
    theirs.is_verified = true;
    repo.save(&theirs).await.unwrap();

    let all = repo
        .list(ResourceFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);

    let verified = repo
        .list(
            ResourceFilter {
                verified_only: true,
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(verified.total, 1);
    assert_eq!(verified.items[0].id, theirs.id);

    let owned = repo
        .list(
            ResourceFilter {
                owner: Some(hospital.entity_ref()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(owned.total, 1);

    let counts = repo.count_by_status(ngo.entity_ref()).await.unwrap();
    assert_eq!(counts, vec![(ResourceStatus::Available, 1)]);
}

#[tokio::test]
async fn request_round_trip_with_approval_and_thread() {
    let db = common::setup().await;
    let owner = common::hospital(&db, "owner@hospital.in").await;
    let requester = common::ngo(&db, "needs@ngo.org").await;
    let resources = SurrealResourceRepository::new(db.clone());
    let requests = SurrealRequestRepository::new(db);

    let resource = resources
        .create(owner.entity_ref(), common::ventilator())
        .await
        .unwrap();
    let mut request = requests
        .create(new_request(requester.entity_ref(), resource.id, Priority::High))
        .await
        .unwrap();
    assert_eq!(request.status.current, RequestStatus::Pending);

    let now = Utc::now();
    lifecycle::add_communication(
        &mut request,
        requester.entity_ref(),
        "Can we collect on Monday?".into(),
        vec!["https://files.example/letter.pdf".into()],
        now,
    );
    lifecycle::update_request_status(
        &mut request,
        RequestStatus::Approved,
        owner.id,
        owner.role,
        Some("ok".into()),
        now,
        lifecycle::TransitionPolicy::Strict,
    )
    .unwrap();
    requests.save(&request).await.unwrap();

    let fetched = requests.get_by_id(request.id).await.unwrap();
    assert_eq!(fetched.version, 1);
    assert_eq!(fetched.status.current, RequestStatus::Approved);
    assert_eq!(fetched.status.history.len(), 1);
    assert_eq!(fetched.status.history[0].status, RequestStatus::Pending);
    let approval = fetched.approval.unwrap();
    assert_eq!(approval.approved_by, owner.id);
    assert_eq!(approval.approver_type, owner.role);
    assert_eq!(fetched.communications.len(), 1);
    assert_eq!(fetched.communications[0].sender, requester.entity_ref());
    assert_eq!(fetched.communications[0].attachments.len(), 1);
    assert_eq!(fetched.requester.entity_type, EntityType::Ngo);
}

#[tokio::test]
async fn stale_request_save_is_a_version_conflict() {
    let db = common::setup().await;
    let owner = common::hospital(&db, "owner@hospital.in").await;
    let requester = common::ngo(&db, "needs@ngo.org").await;
    let resources = SurrealResourceRepository::new(db.clone());
    let requests = SurrealRequestRepository::new(db);
    let resource = resources
        .create(owner.entity_ref(), common::ventilator())
        .await
        .unwrap();
    let created = requests
        .create(new_request(requester.entity_ref(), resource.id, Priority::Medium))
        .await
        .unwrap();

    let mut approved = created.clone();
    let mut cancelled = created;
    let now = Utc::now();
    lifecycle::update_request_status(
        &mut approved,
        RequestStatus::Approved,
        owner.id,
        owner.role,
        None,
        now,
        lifecycle::TransitionPolicy::Strict,
    )
    .unwrap();
    lifecycle::update_request_status(
        &mut cancelled,
        RequestStatus::Cancelled,
        requester.id,
        requester.role,
        Some("found one elsewhere".into()),
        now,
        lifecycle::TransitionPolicy::Strict,
    )
    .unwrap();

    requests.save(&approved).await.unwrap();
    let err = requests.save(&cancelled).await.unwrap_err();
    assert!(matches!(err, CoreError::VersionConflict { .. }), "got {err:?}");

    let stored = requests.get_by_id(approved.id).await.unwrap();
    assert_eq!(stored.status.current, RequestStatus::Approved);
    assert_eq!(stored.status.history.len(), 1);
    assert_eq!(stored.version, 1);
    assert!(stored.approval.is_some());
}

#[tokio::test]
async fn list_by_resource_status_requester_and_owner() {
    let db = common::setup().await;
    let owner = common::hospital(&db, "owner@hospital.in").await;
    let ngo = common::ngo(&db, "needs@ngo.org").await;
    let other = common::hospital(&db, "other@hospital.in").await;
    let resources = SurrealResourceRepository::new(db.clone());
    let requests = SurrealRequestRepository::new(db);

    let resource = resources
        .create(owner.entity_ref(), common::ventilator())
        .await
        .unwrap();
    let unrelated = resources
        .create(other.entity_ref(), common::ventilator())
        .await
        .unwrap();

    let low = requests
        .create(new_request(ngo.entity_ref(), resource.id, Priority::Low))
        .await
        .unwrap();
    requests
        .create(new_request(other.entity_ref(), resource.id, Priority::Urgent))
        .await
        .unwrap();
    requests
        .create(new_request(ngo.entity_ref(), unrelated.id, Priority::Medium))
        .await
        .unwrap();

    let mut rejected = low.clone();
    lifecycle::update_request_status(
        &mut rejected,
        RequestStatus::Rejected,
        owner.id,
        owner.role,
        None,
        Utc::now(),
        lifecycle::TransitionPolicy::Strict,
    )
    .unwrap();
    requests.save(&rejected).await.unwrap();

    let pending = requests
        .list_by_resource_and_status(resource.id, RequestStatus::Pending)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].priority, Priority::Urgent);

    let mine = requests
        .list_by_requester(ngo.entity_ref(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(mine.total, 2);

    let incoming = requests
        .list_incoming(owner.entity_ref(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(incoming.total, 2);
    assert!(incoming.items.iter().all(|r| r.resource_id == resource.id));
}
