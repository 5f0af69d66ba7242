//! SurrealDB implementation of [`AuditLogRepository`].
//!
//! The table is append-only: no update or delete paths exist here, and
//! the schema denies them.

use bloodlink_core::error::CoreResult;
use bloodlink_core::models::audit::{AuditLogEntry, CreateAuditLogEntry};
use bloodlink_core::repository::{
    AuditLogFilter, AuditLogRepository, PaginatedResult, Pagination,
};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_enum, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuditRow {
    record_id: String,
    actor_id: String,
    actor_type: String,
    action: String,
    entity_type: String,
    entity_id: String,
    outcome: String,
    metadata: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl AuditRow {
    fn try_into_entry(self) -> Result<AuditLogEntry, DbError> {
        Ok(AuditLogEntry {
            id: parse_uuid(&self.record_id, "audit_log")?,
            actor_id: parse_uuid(&self.actor_id, "actor")?,
            actor_type: parse_enum(&self.actor_type)?,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: parse_uuid(&self.entity_id, "entity")?,
            outcome: parse_enum(&self.outcome)?,
            metadata: self.metadata,
            timestamp: self.timestamp,
        })
    }
}

/// SurrealDB implementation of the audit log repository.
#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, input: CreateAuditLogEntry) -> CoreResult<AuditLogEntry> {
        let id = Uuid::new_v4();
        let timestamp = Utc::now();
        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        self.db
            .query(
                "CREATE type::record('audit_log', $id) SET \
                 actor_id = $actor_id, actor_type = $actor_type, \
                 action = $action, entity_type = $entity_type, \
                 entity_id = $entity_id, outcome = $outcome, \
                 metadata = $metadata, timestamp = $timestamp \
                 RETURN NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("actor_id", input.actor_id.to_string()))
            .bind(("actor_type", input.actor_type.as_str().to_string()))
            .bind(("action", input.action.clone()))
            .bind(("entity_type", input.entity_type.clone()))
            .bind(("entity_id", input.entity_id.to_string()))
            .bind(("outcome", input.outcome.as_str().to_string()))
            .bind(("metadata", metadata.clone()))
            .bind(("timestamp", timestamp))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(AuditLogEntry {
            id,
            actor_id: input.actor_id,
            actor_type: input.actor_type,
            action: input.action,
            entity_type: input.entity_type,
            entity_id: input.entity_id,
            outcome: input.outcome,
            metadata,
            timestamp,
        })
    }

    async fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> CoreResult<PaginatedResult<AuditLogEntry>> {
        let mut conditions = Vec::new();
        if filter.actor_id.is_some() {
            conditions.push("actor_id = $actor_id");
        }
        if filter.action.is_some() {
            conditions.push("action = $action");
        }
        if filter.entity_id.is_some() {
            conditions.push("entity_id = $entity_id");
        }
        if filter.from.is_some() {
            conditions.push("timestamp >= $from");
        }
        if filter.to.is_some() {
            conditions.push("timestamp <= $to");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT count() AS total FROM audit_log {where_clause} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM audit_log {where_clause} \
             ORDER BY timestamp DESC LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(actor_id) = filter.actor_id {
            builder = builder.bind(("actor_id", actor_id.to_string()));
        }
        if let Some(action) = filter.action {
            builder = builder.bind(("action", action));
        }
        if let Some(entity_id) = filter.entity_id {
            builder = builder.bind(("entity_id", entity_id.to_string()));
        }
        if let Some(from) = filter.from {
            builder = builder.bind(("from", from));
        }
        if let Some(to) = filter.to {
            builder = builder.bind(("to", to));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);
        let rows: Vec<AuditRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(AuditRow::try_into_entry)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
