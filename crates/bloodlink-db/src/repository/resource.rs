//! SurrealDB implementation of [`ResourceRepository`].
//!
//! Writes are compare-and-set on `version`: `save` only applies when the
//! stored version equals the one on the value being saved.

use bloodlink_core::error::CoreResult;
use bloodlink_core::models::common::EntityRef;
use bloodlink_core::models::resource::{
    CreateResource, Resource, ResourceFilter, ResourceStatus, ResourceStatusState,
};
use bloodlink_core::repository::{PaginatedResult, Pagination, ResourceRepository};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::warn;
use uuid::Uuid;

use super::{
    CountRow, StatusCountRow, VersionRow, entity_ref_json, entity_type_str, from_json,
    from_json_opt, parse_status_counts, parse_uuid, to_json, to_json_opt,
};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ResourceRow {
    record_id: String,
    name: String,
    description: Option<String>,
    owner: serde_json::Value,
    details: serde_json::Value,
    quantity: u32,
    location: Option<serde_json::Value>,
    status: serde_json::Value,
    is_verified: bool,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ResourceRow {
    fn try_into_resource(self) -> Result<Resource, DbError> {
        Ok(Resource {
            id: parse_uuid(&self.record_id, "resource")?,
            name: self.name,
            description: self.description,
            owner: from_json(self.owner)?,
            details: from_json(self.details)?,
            quantity: self.quantity,
            location: from_json_opt(self.location)?,
            status: from_json(self.status)?,
            is_verified: self.is_verified,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_RESOURCE: &str = "SELECT meta::id(id) AS record_id, * FROM";

/// SurrealDB implementation of the Resource repository.
#[derive(Clone)]
pub struct SurrealResourceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealResourceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, id: Uuid) -> Result<Resource, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(format!("{SELECT_RESOURCE} type::record('resource', $id)"))
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<ResourceRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "resource".into(),
            id: id_str,
        })?;
        row.try_into_resource()
    }
}

impl<C: Connection> ResourceRepository for SurrealResourceRepository<C> {
    async fn create(&self, owner: EntityRef, input: CreateResource) -> CoreResult<Resource> {
        let now = Utc::now();
        let resource = Resource {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            owner,
            details: input.details,
            quantity: input.quantity,
            location: input.location,
            status: ResourceStatusState {
                current: ResourceStatus::Available,
                history: Vec::new(),
                last_updated: now,
            },
            is_verified: false,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.db
            .query(
                "CREATE type::record('resource', $id) SET \
                 name = $name, description = $description, \
                 owner = $owner, kind = $kind, details = $details, \
                 quantity = $quantity, location = $location, \
                 status = $status, is_verified = false, version = 0, \
                 created_at = $now, updated_at = $now \
                 RETURN NONE",
            )
            .bind(("id", resource.id.to_string()))
            .bind(("name", resource.name.clone()))
            .bind(("description", resource.description.clone()))
            .bind(("owner", entity_ref_json(owner)))
            .bind(("kind", resource.kind().as_str().to_string()))
            .bind(("details", to_json(&resource.details)?))
            .bind(("quantity", resource.quantity))
            .bind(("location", to_json_opt(&resource.location)?))
            .bind(("status", to_json(&resource.status)?))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("resource", e))?;

        Ok(resource)
    }

    async fn get_by_id(&self, id: Uuid) -> CoreResult<Resource> {
        Ok(self.fetch_one(id).await?)
    }

    async fn save(&self, resource: &Resource) -> CoreResult<Resource> {
        let now = Utc::now();
        let mut result = self
            .db
            .query(
                "UPDATE type::record('resource', $id) SET \
                 status = $status, is_verified = $is_verified, \
                 quantity = $quantity, version = version + 1, \
                 updated_at = $now \
                 WHERE version = $version RETURN version",
            )
            .bind(("id", resource.id.to_string()))
            .bind(("status", to_json(&resource.status)?))
            .bind(("is_verified", resource.is_verified))
            .bind(("quantity", resource.quantity))
            .bind(("now", now))
            .bind(("version", resource.version))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let updated: Vec<VersionRow> = result.take(0).map_err(DbError::from)?;
        if updated.is_empty() {
            // Distinguish a missing record from a stale version.
            self.fetch_one(resource.id).await?;
            warn!(resource_id = %resource.id, version = resource.version, "Stale resource write rejected");
            return Err(DbError::VersionConflict {
                entity: "resource".into(),
                id: resource.id.to_string(),
            }
            .into());
        }

        Ok(Resource {
            version: resource.version + 1,
            updated_at: now,
            ..resource.clone()
        })
    }

    async fn list(
        &self,
        filter: ResourceFilter,
        pagination: Pagination,
    ) -> CoreResult<PaginatedResult<Resource>> {
        let mut conditions = Vec::new();
        if filter.kind.is_some() {
            conditions.push("kind = $kind");
        }
        if filter.status.is_some() {
            conditions.push("status.current = $status");
        }
        if filter.owner.is_some() {
            conditions.push("owner.id = $owner_id AND owner.entity_type = $owner_type");
        }
        if filter.verified_only {
            conditions.push("is_verified = true");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT count() AS total FROM resource {where_clause} GROUP ALL; \
             {SELECT_RESOURCE} resource {where_clause} \
             ORDER BY created_at DESC LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(kind) = filter.kind {
            builder = builder.bind(("kind", kind.as_str().to_string()));
        }
        if let Some(status) = filter.status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }
        if let Some(owner) = filter.owner {
            builder = builder
                .bind(("owner_id", owner.id.to_string()))
                .bind(("owner_type", entity_type_str(owner.entity_type)));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);
        let rows: Vec<ResourceRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(ResourceRow::try_into_resource)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn count_by_status(&self, owner: EntityRef) -> CoreResult<Vec<(ResourceStatus, u64)>> {
        let mut result = self
            .db
            .query(
                "SELECT status.current AS current, count() AS total FROM resource \
                 WHERE owner.id = $owner_id AND owner.entity_type = $owner_type \
                 GROUP BY current",
            )
            .bind(("owner_id", owner.id.to_string()))
            .bind(("owner_type", entity_type_str(owner.entity_type)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StatusCountRow> = result.take(0).map_err(DbError::from)?;
        Ok(parse_status_counts(rows)?)
    }
}
