//! SurrealDB implementation of [`RequestRepository`].
//!
//! Status, approval and the communication thread are written back together
//! by `save`, which is compare-and-set on `version`.

use bloodlink_core::error::CoreResult;
use bloodlink_core::models::common::EntityRef;
use bloodlink_core::models::request::{
    NewRequest, Request, RequestQuantity, RequestStatus, RequestStatusState,
};
use bloodlink_core::repository::{PaginatedResult, Pagination, RequestRepository};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::warn;
use uuid::Uuid;

use super::{
    CountRow, StatusCountRow, VersionRow, entity_ref_json, entity_type_str, from_json,
    from_json_opt, parse_enum, parse_status_counts, parse_uuid, to_json, to_json_opt,
};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RequestRow {
    record_id: String,
    requester: serde_json::Value,
    resource_id: String,
    resource_kind: String,
    quantity: serde_json::Value,
    duration: serde_json::Value,
    status: serde_json::Value,
    priority: String,
    purpose: String,
    location: Option<serde_json::Value>,
    approval: Option<serde_json::Value>,
    communications: serde_json::Value,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RequestRow {
    fn try_into_request(self) -> Result<Request, DbError> {
        Ok(Request {
            id: parse_uuid(&self.record_id, "request")?,
            requester: from_json(self.requester)?,
            resource_id: parse_uuid(&self.resource_id, "resource")?,
            resource_kind: parse_enum(&self.resource_kind)?,
            quantity: from_json(self.quantity)?,
            duration: from_json(self.duration)?,
            status: from_json(self.status)?,
            priority: parse_enum(&self.priority)?,
            purpose: self.purpose,
            location: from_json_opt(self.location)?,
            approval: from_json_opt(self.approval)?,
            communications: from_json(self.communications)?,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn rows_into_requests(rows: Vec<RequestRow>) -> Result<Vec<Request>, DbError> {
    rows.into_iter().map(RequestRow::try_into_request).collect()
}

const SELECT_REQUEST: &str = "SELECT meta::id(id) AS record_id, * FROM";

/// SurrealDB implementation of the Request repository.
#[derive(Clone)]
pub struct SurrealRequestRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRequestRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, id: Uuid) -> Result<Request, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(format!("{SELECT_REQUEST} type::record('request', $id)"))
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<RequestRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "request".into(),
            id: id_str,
        })?;
        row.try_into_request()
    }
}

impl<C: Connection> RequestRepository for SurrealRequestRepository<C> {
    async fn create(&self, input: NewRequest) -> CoreResult<Request> {
        let now = Utc::now();
        let request = Request {
            id: Uuid::new_v4(),
            requester: input.requester,
            resource_id: input.resource_id,
            resource_kind: input.resource_kind,
            quantity: RequestQuantity {
                requested: input.quantity,
                approved: None,
            },
            duration: input.duration,
            status: RequestStatusState {
                current: RequestStatus::Pending,
                history: Vec::new(),
            },
            priority: input.priority,
            purpose: input.purpose,
            location: input.location,
            approval: None,
            communications: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.db
            .query(
                "CREATE type::record('request', $id) SET \
                 requester = $requester, resource_id = $resource_id, \
                 resource_kind = $resource_kind, quantity = $quantity, \
                 duration = $duration, status = $status, \
                 priority = $priority, purpose = $purpose, \
                 location = $location, approval = NONE, \
                 communications = [], version = 0, \
                 created_at = $now, updated_at = $now \
                 RETURN NONE",
            )
            .bind(("id", request.id.to_string()))
            .bind(("requester", entity_ref_json(request.requester)))
            .bind(("resource_id", request.resource_id.to_string()))
            .bind(("resource_kind", request.resource_kind.as_str().to_string()))
            .bind(("quantity", to_json(&request.quantity)?))
            .bind(("duration", to_json(&request.duration)?))
            .bind(("status", to_json(&request.status)?))
            .bind(("priority", request.priority.as_str().to_string()))
            .bind(("purpose", request.purpose.clone()))
            .bind(("location", to_json_opt(&request.location)?))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("request", e))?;

        Ok(request)
    }

    async fn get_by_id(&self, id: Uuid) -> CoreResult<Request> {
        Ok(self.fetch_one(id).await?)
    }

    async fn save(&self, request: &Request) -> CoreResult<Request> {
        let now = Utc::now();
        let mut result = self
            .db
            .query(
                "UPDATE type::record('request', $id) SET \
                 status = $status, quantity = $quantity, \
                 approval = $approval, communications = $communications, \
                 version = version + 1, updated_at = $now \
                 WHERE version = $version RETURN version",
            )
            .bind(("id", request.id.to_string()))
            .bind(("status", to_json(&request.status)?))
            .bind(("quantity", to_json(&request.quantity)?))
            .bind(("approval", to_json_opt(&request.approval)?))
            .bind(("communications", to_json(&request.communications)?))
            .bind(("now", now))
            .bind(("version", request.version))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let updated: Vec<VersionRow> = result.take(0).map_err(DbError::from)?;
        if updated.is_empty() {
            self.fetch_one(request.id).await?;
            warn!(request_id = %request.id, version = request.version, "Stale request write rejected");
            return Err(DbError::VersionConflict {
                entity: "request".into(),
                id: request.id.to_string(),
            }
            .into());
        }

        Ok(Request {
            version: request.version + 1,
            updated_at: now,
            ..request.clone()
        })
    }

    async fn list_by_resource_and_status(
        &self,
        resource_id: Uuid,
        status: RequestStatus,
    ) -> CoreResult<Vec<Request>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_REQUEST} request \
                 WHERE resource_id = $resource_id AND status.current = $status"
            ))
            .bind(("resource_id", resource_id.to_string()))
            .bind(("status", status.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RequestRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows_into_requests(rows)?)
    }

    async fn list_by_requester(
        &self,
        requester: EntityRef,
        pagination: Pagination,
    ) -> CoreResult<PaginatedResult<Request>> {
        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM request \
                 WHERE requester.id = $requester_id \
                 AND requester.entity_type = $requester_type GROUP ALL; \
                 {SELECT_REQUEST} request \
                 WHERE requester.id = $requester_id \
                 AND requester.entity_type = $requester_type \
                 ORDER BY created_at DESC LIMIT $limit START $offset;"
            ))
            .bind(("requester_id", requester.id.to_string()))
            .bind(("requester_type", entity_type_str(requester.entity_type)))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);
        let rows: Vec<RequestRow> = result.take(1).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: rows_into_requests(rows)?,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_incoming(
        &self,
        owner: EntityRef,
        pagination: Pagination,
    ) -> CoreResult<PaginatedResult<Request>> {
        let mut result = self
            .db
            .query(format!(
                "LET $owned = (SELECT VALUE meta::id(id) FROM resource \
                 WHERE owner.id = $owner_id AND owner.entity_type = $owner_type); \
                 SELECT count() AS total FROM request \
                 WHERE resource_id IN $owned GROUP ALL; \
                 {SELECT_REQUEST} request WHERE resource_id IN $owned \
                 ORDER BY created_at DESC LIMIT $limit START $offset;"
            ))
            .bind(("owner_id", owner.id.to_string()))
            .bind(("owner_type", entity_type_str(owner.entity_type)))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(1).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);
        let rows: Vec<RequestRow> = result.take(2).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: rows_into_requests(rows)?,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn count_by_requester_status(
        &self,
        requester: EntityRef,
    ) -> CoreResult<Vec<(RequestStatus, u64)>> {
        let mut result = self
            .db
            .query(
                "SELECT status.current AS current, count() AS total FROM request \
                 WHERE requester.id = $requester_id \
                 AND requester.entity_type = $requester_type \
                 GROUP BY current",
            )
            .bind(("requester_id", requester.id.to_string()))
            .bind(("requester_type", entity_type_str(requester.entity_type)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StatusCountRow> = result.take(0).map_err(DbError::from)?;
        Ok(parse_status_counts(rows)?)
    }

    async fn count_incoming(&self, owner: EntityRef, status: RequestStatus) -> CoreResult<u64> {
        let mut result = self
            .db
            .query(
                "LET $owned = (SELECT VALUE meta::id(id) FROM resource \
                 WHERE owner.id = $owner_id AND owner.entity_type = $owner_type); \
                 SELECT count() AS total FROM request \
                 WHERE resource_id IN $owned AND status.current = $status GROUP ALL;",
            )
            .bind(("owner_id", owner.id.to_string()))
            .bind(("owner_type", entity_type_str(owner.entity_type)))
            .bind(("status", status.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(1).map_err(DbError::from)?;
        Ok(count_rows.first().map(|r| r.total).unwrap_or(0))
    }
}
