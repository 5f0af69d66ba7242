//! SurrealDB implementation of [`CenterRepository`].

use bloodlink_core::error::CoreResult;
use bloodlink_core::models::center::{Center, CreateCenter};
use bloodlink_core::models::common::{EntityRef, GeoBounds};
use bloodlink_core::repository::{CenterRepository, PaginatedResult, Pagination};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::warn;
use uuid::Uuid;

use super::{
    CountRow, VersionRow, entity_ref_json, entity_type_str, from_json, parse_uuid, to_json,
};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct CenterRow {
    record_id: String,
    name: String,
    operator: serde_json::Value,
    address: serde_json::Value,
    location: serde_json::Value,
    operating_hours: Option<String>,
    contact_phone: String,
    inventory: serde_json::Value,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CenterRow {
    fn try_into_center(self) -> Result<Center, DbError> {
        Ok(Center {
            id: parse_uuid(&self.record_id, "center")?,
            name: self.name,
            operator: from_json(self.operator)?,
            address: from_json(self.address)?,
            location: from_json(self.location)?,
            operating_hours: self.operating_hours,
            contact_phone: self.contact_phone,
            inventory: from_json(self.inventory)?,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn rows_into_centers(rows: Vec<CenterRow>) -> Result<Vec<Center>, DbError> {
    rows.into_iter().map(CenterRow::try_into_center).collect()
}

const SELECT_CENTER: &str = "SELECT meta::id(id) AS record_id, * FROM";

/// SurrealDB implementation of the Center repository.
#[derive(Clone)]
pub struct SurrealCenterRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCenterRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, id: Uuid) -> Result<Center, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(format!("{SELECT_CENTER} type::record('center', $id)"))
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<CenterRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "center".into(),
            id: id_str,
        })?;
        row.try_into_center()
    }
}

impl<C: Connection> CenterRepository for SurrealCenterRepository<C> {
    async fn create(&self, operator: EntityRef, input: CreateCenter) -> CoreResult<Center> {
        let now = Utc::now();
        let center = Center {
            id: Uuid::new_v4(),
            name: input.name,
            operator,
            address: input.address,
            location: input.location,
            operating_hours: input.operating_hours,
            contact_phone: input.contact_phone,
            inventory: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.db
            .query(
                "CREATE type::record('center', $id) SET \
                 name = $name, operator = $operator, \
                 address = $address, location = $location, \
                 operating_hours = $operating_hours, \
                 contact_phone = $contact_phone, inventory = [], \
                 version = 0, created_at = $now, updated_at = $now \
                 RETURN NONE",
            )
            .bind(("id", center.id.to_string()))
            .bind(("name", center.name.clone()))
            .bind(("operator", entity_ref_json(operator)))
            .bind(("address", to_json(&center.address)?))
            .bind(("location", to_json(&center.location)?))
            .bind(("operating_hours", center.operating_hours.clone()))
            .bind(("contact_phone", center.contact_phone.clone()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("center", e))?;

        Ok(center)
    }

    async fn get_by_id(&self, id: Uuid) -> CoreResult<Center> {
        Ok(self.fetch_one(id).await?)
    }

    async fn save(&self, center: &Center) -> CoreResult<Center> {
        let now = Utc::now();
        let mut result = self
            .db
            .query(
                "UPDATE type::record('center', $id) SET \
                 inventory = $inventory, version = version + 1, \
                 updated_at = $now \
                 WHERE version = $version RETURN version",
            )
            .bind(("id", center.id.to_string()))
            .bind(("inventory", to_json(&center.inventory)?))
            .bind(("now", now))
            .bind(("version", center.version))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let updated: Vec<VersionRow> = result.take(0).map_err(DbError::from)?;
        if updated.is_empty() {
            self.fetch_one(center.id).await?;
            warn!(center_id = %center.id, version = center.version, "Stale center write rejected");
            return Err(DbError::VersionConflict {
                entity: "center".into(),
                id: center.id.to_string(),
            }
            .into());
        }

        Ok(Center {
            version: center.version + 1,
            updated_at: now,
            ..center.clone()
        })
    }

    async fn list(&self, pagination: Pagination) -> CoreResult<PaginatedResult<Center>> {
        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM center GROUP ALL; \
                 {SELECT_CENTER} center ORDER BY name ASC \
                 LIMIT $limit START $offset;"
            ))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);
        let rows: Vec<CenterRow> = result.take(1).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: rows_into_centers(rows)?,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_within(&self, bounds: GeoBounds) -> CoreResult<Vec<Center>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_CENTER} center \
                 WHERE location.coordinates[0] >= $min_lon \
                 AND location.coordinates[0] <= $max_lon \
                 AND location.coordinates[1] >= $min_lat \
                 AND location.coordinates[1] <= $max_lat"
            ))
            .bind(("min_lon", bounds.min_longitude))
            .bind(("max_lon", bounds.max_longitude))
            .bind(("min_lat", bounds.min_latitude))
            .bind(("max_lat", bounds.max_latitude))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CenterRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows_into_centers(rows)?)
    }

    async fn list_by_operator(&self, operator: EntityRef) -> CoreResult<Vec<Center>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_CENTER} center \
                 WHERE operator.id = $operator_id \
                 AND operator.entity_type = $operator_type \
                 ORDER BY name ASC"
            ))
            .bind(("operator_id", operator.id.to_string()))
            .bind(("operator_type", entity_type_str(operator.entity_type)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CenterRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows_into_centers(rows)?)
    }
}
