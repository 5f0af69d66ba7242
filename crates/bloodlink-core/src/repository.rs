//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Mutable workflow documents
//! (resources, requests, centers, appointments) are written back with
//! `save`, which must fail with [`CoreError::VersionConflict`] when the
//! stored `version` no longer matches the one the caller read.
//!
//! [`CoreError::VersionConflict`]: crate::error::CoreError::VersionConflict

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::{
    appointment::{CreateAppointment, DonationAppointment},
    audit::{AuditLogEntry, CreateAuditLogEntry},
    center::{Center, CreateCenter},
    common::{EntityRef, GeoBounds, Role},
    donation::{BloodDonation, CreateDonation},
    hospital::{CreateHospital, Hospital, UpdateHospital},
    ngo::{CreateNgo, Ngo, UpdateNgo},
    request::{NewRequest, Request, RequestStatus},
    resource::{CreateResource, Resource, ResourceFilter, ResourceStatus},
    session::{CreateSession, Session},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = CoreResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CoreResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = CoreResult<User>> + Send;
    fn update(&self, id: Uuid, input: UpdateUser)
    -> impl Future<Output = CoreResult<User>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = CoreResult<PaginatedResult<User>>> + Send;
}

pub trait HospitalRepository: Send + Sync {
    fn create(&self, input: CreateHospital) -> impl Future<Output = CoreResult<Hospital>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CoreResult<Hospital>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = CoreResult<Hospital>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateHospital,
    ) -> impl Future<Output = CoreResult<Hospital>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = CoreResult<PaginatedResult<Hospital>>> + Send;
}

pub trait NgoRepository: Send + Sync {
    fn create(&self, input: CreateNgo) -> impl Future<Output = CoreResult<Ngo>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CoreResult<Ngo>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = CoreResult<Ngo>> + Send;
    fn update(&self, id: Uuid, input: UpdateNgo) -> impl Future<Output = CoreResult<Ngo>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = CoreResult<PaginatedResult<Ngo>>> + Send;
}

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = CoreResult<Session>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = CoreResult<Session>> + Send;
    /// Delete the session holding `token_hash` and return it. Exactly one
    /// of several concurrent callers succeeds; the rest get `NotFound`.
    fn consume_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = CoreResult<Session>> + Send;
    /// Invalidate every session belonging to an account.
    fn invalidate_account_sessions(
        &self,
        account_id: Uuid,
        role: Role,
    ) -> impl Future<Output = CoreResult<()>> + Send;
    /// Remove all expired sessions.
    fn cleanup_expired(&self) -> impl Future<Output = CoreResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Resources & requests
// ---------------------------------------------------------------------------

pub trait ResourceRepository: Send + Sync {
    fn create(
        &self,
        owner: EntityRef,
        input: CreateResource,
    ) -> impl Future<Output = CoreResult<Resource>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CoreResult<Resource>> + Send;
    /// Write back status, verification and quantity; bumps `version`.
    fn save(&self, resource: &Resource) -> impl Future<Output = CoreResult<Resource>> + Send;
    fn list(
        &self,
        filter: ResourceFilter,
        pagination: Pagination,
    ) -> impl Future<Output = CoreResult<PaginatedResult<Resource>>> + Send;
    /// Number of resources `owner` holds in each status.
    fn count_by_status(
        &self,
        owner: EntityRef,
    ) -> impl Future<Output = CoreResult<Vec<(ResourceStatus, u64)>>> + Send;
}

pub trait RequestRepository: Send + Sync {
    fn create(&self, input: NewRequest) -> impl Future<Output = CoreResult<Request>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CoreResult<Request>> + Send;
    /// Write back status, approval, quantity and communications; bumps
    /// `version`.
    fn save(&self, request: &Request) -> impl Future<Output = CoreResult<Request>> + Send;
    /// All requests against a resource currently in `status`, unordered.
    fn list_by_resource_and_status(
        &self,
        resource_id: Uuid,
        status: RequestStatus,
    ) -> impl Future<Output = CoreResult<Vec<Request>>> + Send;
    /// Requests filed by `requester`, newest first.
    fn list_by_requester(
        &self,
        requester: EntityRef,
        pagination: Pagination,
    ) -> impl Future<Output = CoreResult<PaginatedResult<Request>>> + Send;
    /// Requests against any resource owned by `owner`, newest first.
    fn list_incoming(
        &self,
        owner: EntityRef,
        pagination: Pagination,
    ) -> impl Future<Output = CoreResult<PaginatedResult<Request>>> + Send;
    /// Number of requests filed by `requester` in each status.
    fn count_by_requester_status(
        &self,
        requester: EntityRef,
    ) -> impl Future<Output = CoreResult<Vec<(RequestStatus, u64)>>> + Send;
    /// Number of requests in `status` against resources owned by `owner`.
    fn count_incoming(
        &self,
        owner: EntityRef,
        status: RequestStatus,
    ) -> impl Future<Output = CoreResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Centers, appointments & donations
// ---------------------------------------------------------------------------

pub trait CenterRepository: Send + Sync {
    fn create(
        &self,
        operator: EntityRef,
        input: CreateCenter,
    ) -> impl Future<Output = CoreResult<Center>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CoreResult<Center>> + Send;
    /// Write back the inventory; bumps `version`.
    fn save(&self, center: &Center) -> impl Future<Output = CoreResult<Center>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = CoreResult<PaginatedResult<Center>>> + Send;
    /// Centers whose stored location falls inside `bounds`.
    fn list_within(&self, bounds: GeoBounds)
    -> impl Future<Output = CoreResult<Vec<Center>>> + Send;
    fn list_by_operator(
        &self,
        operator: EntityRef,
    ) -> impl Future<Output = CoreResult<Vec<Center>>> + Send;
}

pub trait AppointmentRepository: Send + Sync {
    fn create(
        &self,
        donor_id: Uuid,
        input: CreateAppointment,
    ) -> impl Future<Output = CoreResult<DonationAppointment>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CoreResult<DonationAppointment>> + Send;
    fn save(
        &self,
        appointment: &DonationAppointment,
    ) -> impl Future<Output = CoreResult<DonationAppointment>> + Send;
    /// A donor's appointments, soonest first.
    fn list_by_donor(
        &self,
        donor_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CoreResult<PaginatedResult<DonationAppointment>>> + Send;
    /// A donor's scheduled appointments after `after`, soonest first.
    fn list_upcoming_by_donor(
        &self,
        donor_id: Uuid,
        after: DateTime<Utc>,
    ) -> impl Future<Output = CoreResult<Vec<DonationAppointment>>> + Send;
}

pub trait DonationRepository: Send + Sync {
    fn create(&self, input: CreateDonation)
    -> impl Future<Output = CoreResult<BloodDonation>> + Send;
    /// A donor's donations, most recent first.
    fn list_by_donor(
        &self,
        donor_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CoreResult<PaginatedResult<BloodDonation>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit (append-only)
// ---------------------------------------------------------------------------

/// Query filters for audit log entries.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
    pub entity_id: Option<Uuid>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
}

pub trait AuditLogRepository: Send + Sync {
    /// Append a new audit log entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = CoreResult<AuditLogEntry>> + Send;
    fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = CoreResult<PaginatedResult<AuditLogEntry>>> + Send;
}
