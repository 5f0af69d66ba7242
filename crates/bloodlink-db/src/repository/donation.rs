//! SurrealDB implementation of [`DonationRepository`].

use bloodlink_core::error::CoreResult;
use bloodlink_core::models::donation::{BloodDonation, CreateDonation};
use bloodlink_core::repository::{DonationRepository, PaginatedResult, Pagination};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_enum, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct DonationRow {
    record_id: String,
    donor_id: String,
    center_id: String,
    appointment_id: Option<String>,
    blood_group: String,
    units: u32,
    donated_at: DateTime<Utc>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl DonationRow {
    fn try_into_donation(self) -> Result<BloodDonation, DbError> {
        Ok(BloodDonation {
            id: parse_uuid(&self.record_id, "donation")?,
            donor_id: parse_uuid(&self.donor_id, "donor")?,
            center_id: parse_uuid(&self.center_id, "center")?,
            appointment_id: self
                .appointment_id
                .as_deref()
                .map(|id| parse_uuid(id, "appointment"))
                .transpose()?,
            blood_group: parse_enum(&self.blood_group)?,
            units: self.units,
            donated_at: self.donated_at,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Donation repository.
#[derive(Clone)]
pub struct SurrealDonationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDonationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DonationRepository for SurrealDonationRepository<C> {
    async fn create(&self, input: CreateDonation) -> CoreResult<BloodDonation> {
        let now = Utc::now();
        let donation = BloodDonation {
            id: Uuid::new_v4(),
            donor_id: input.donor_id,
            center_id: input.center_id,
            appointment_id: input.appointment_id,
            blood_group: input.blood_group,
            units: input.units,
            donated_at: input.donated_at.unwrap_or(now),
            notes: input.notes,
            created_at: now,
        };

        self.db
            .query(
                "CREATE type::record('donation', $id) SET \
                 donor_id = $donor_id, center_id = $center_id, \
                 appointment_id = $appointment_id, \
                 blood_group = $blood_group, units = $units, \
                 donated_at = $donated_at, notes = $notes, \
                 created_at = $now \
                 RETURN NONE",
            )
            .bind(("id", donation.id.to_string()))
            .bind(("donor_id", donation.donor_id.to_string()))
            .bind(("center_id", donation.center_id.to_string()))
            .bind((
                "appointment_id",
                donation.appointment_id.map(|id| id.to_string()),
            ))
            .bind(("blood_group", donation.blood_group.as_str().to_string()))
            .bind(("units", donation.units))
            .bind(("donated_at", donation.donated_at))
            .bind(("notes", donation.notes.clone()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("donation", e))?;

        Ok(donation)
    }

    async fn list_by_donor(
        &self,
        donor_id: Uuid,
        pagination: Pagination,
    ) -> CoreResult<PaginatedResult<BloodDonation>> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM donation \
                 WHERE donor_id = $donor_id GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM donation \
                 WHERE donor_id = $donor_id \
                 ORDER BY donated_at DESC LIMIT $limit START $offset;",
            )
            .bind(("donor_id", donor_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);
        let rows: Vec<DonationRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(DonationRow::try_into_donation)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
