//! SurrealDB implementation of [`AppointmentRepository`].

use bloodlink_core::error::CoreResult;
use bloodlink_core::models::appointment::{
    AppointmentStatus, CreateAppointment, DonationAppointment,
};
use bloodlink_core::repository::{AppointmentRepository, PaginatedResult, Pagination};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::warn;
use uuid::Uuid;

use super::{CountRow, VersionRow, parse_enum, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AppointmentRow {
    record_id: String,
    donor_id: String,
    center_id: String,
    scheduled_at: DateTime<Utc>,
    blood_group: Option<String>,
    status: String,
    notes: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AppointmentRow {
    fn try_into_appointment(self) -> Result<DonationAppointment, DbError> {
        Ok(DonationAppointment {
            id: parse_uuid(&self.record_id, "appointment")?,
            donor_id: parse_uuid(&self.donor_id, "donor")?,
            center_id: parse_uuid(&self.center_id, "center")?,
            scheduled_at: self.scheduled_at,
            blood_group: self.blood_group.as_deref().map(parse_enum).transpose()?,
            status: parse_enum(&self.status)?,
            notes: self.notes,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_APPOINTMENT: &str = "SELECT meta::id(id) AS record_id, * FROM";

/// SurrealDB implementation of the Appointment repository.
#[derive(Clone)]
pub struct SurrealAppointmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAppointmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, id: Uuid) -> Result<DonationAppointment, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(format!("{SELECT_APPOINTMENT} type::record('appointment', $id)"))
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<AppointmentRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "appointment".into(),
            id: id_str,
        })?;
        row.try_into_appointment()
    }
}

impl<C: Connection> AppointmentRepository for SurrealAppointmentRepository<C> {
    async fn create(
        &self,
        donor_id: Uuid,
        input: CreateAppointment,
    ) -> CoreResult<DonationAppointment> {
        let now = Utc::now();
        let appointment = DonationAppointment {
            id: Uuid::new_v4(),
            donor_id,
            center_id: input.center_id,
            scheduled_at: input.scheduled_at,
            blood_group: input.blood_group,
            status: AppointmentStatus::Scheduled,
            notes: input.notes,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.db
            .query(
                "CREATE type::record('appointment', $id) SET \
                 donor_id = $donor_id, center_id = $center_id, \
                 scheduled_at = $scheduled_at, blood_group = $blood_group, \
                 status = 'Scheduled', notes = $notes, version = 0, \
                 created_at = $now, updated_at = $now \
                 RETURN NONE",
            )
            .bind(("id", appointment.id.to_string()))
            .bind(("donor_id", donor_id.to_string()))
            .bind(("center_id", appointment.center_id.to_string()))
            .bind(("scheduled_at", appointment.scheduled_at))
            .bind((
                "blood_group",
                appointment.blood_group.map(|g| g.as_str().to_string()),
            ))
            .bind(("notes", appointment.notes.clone()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("appointment", e))?;

        Ok(appointment)
    }

    async fn get_by_id(&self, id: Uuid) -> CoreResult<DonationAppointment> {
        Ok(self.fetch_one(id).await?)
    }

    async fn save(&self, appointment: &DonationAppointment) -> CoreResult<DonationAppointment> {
        let now = Utc::now();
        let mut result = self
            .db
            .query(
                "UPDATE type::record('appointment', $id) SET \
                 status = $status, notes = $notes, \
                 version = version + 1, updated_at = $now \
                 WHERE version = $version RETURN version",
            )
            .bind(("id", appointment.id.to_string()))
            .bind(("status", appointment.status.as_str().to_string()))
            .bind(("notes", appointment.notes.clone()))
            .bind(("now", now))
            .bind(("version", appointment.version))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let updated: Vec<VersionRow> = result.take(0).map_err(DbError::from)?;
        if updated.is_empty() {
            self.fetch_one(appointment.id).await?;
            warn!(appointment_id = %appointment.id, version = appointment.version, "Stale appointment write rejected");
            return Err(DbError::VersionConflict {
                entity: "appointment".into(),
                id: appointment.id.to_string(),
            }
            .into());
        }

        Ok(DonationAppointment {
            version: appointment.version + 1,
            updated_at: now,
            ..appointment.clone()
        })
    }

    async fn list_by_donor(
        &self,
        donor_id: Uuid,
        pagination: Pagination,
    ) -> CoreResult<PaginatedResult<DonationAppointment>> {
        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM appointment \
                 WHERE donor_id = $donor_id GROUP ALL; \
                 {SELECT_APPOINTMENT} appointment WHERE donor_id = $donor_id \
                 ORDER BY scheduled_at ASC LIMIT $limit START $offset;"
            ))
            .bind(("donor_id", donor_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);
        let rows: Vec<AppointmentRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(AppointmentRow::try_into_appointment)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_upcoming_by_donor(
        &self,
        donor_id: Uuid,
        after: DateTime<Utc>,
    ) -> CoreResult<Vec<DonationAppointment>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_APPOINTMENT} appointment \
                 WHERE donor_id = $donor_id AND status = 'Scheduled' \
                 AND scheduled_at > $after ORDER BY scheduled_at ASC"
            ))
            .bind(("donor_id", donor_id.to_string()))
            .bind(("after", after))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AppointmentRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(AppointmentRow::try_into_appointment)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
