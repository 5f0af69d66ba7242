//! SurrealDB implementation of [`HospitalRepository`].

use bloodlink_core::error::CoreResult;
use bloodlink_core::models::hospital::{CreateHospital, Hospital, UpdateHospital};
use bloodlink_core::repository::{HospitalRepository, PaginatedResult, Pagination};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, from_json, from_json_opt, parse_enum, parse_uuid, to_json, to_json_opt};
use crate::error::DbError;
use crate::password::hash_password;

#[derive(Debug, SurrealValue)]
struct HospitalRow {
    record_id: String,
    name: String,
    email: String,
    phone: String,
    password_hash: String,
    registration_number: String,
    address: serde_json::Value,
    location: Option<serde_json::Value>,
    specialities: serde_json::Value,
    emergency_contact: Option<String>,
    is_verified: bool,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl HospitalRow {
    fn try_into_hospital(self) -> Result<Hospital, DbError> {
        Ok(Hospital {
            id: parse_uuid(&self.record_id, "hospital")?,
            name: self.name,
            email: self.email,
            phone: self.phone,
            password_hash: self.password_hash,
            registration_number: self.registration_number,
            address: from_json(self.address)?,
            location: from_json_opt(self.location)?,
            specialities: from_json(self.specialities)?,
            emergency_contact: self.emergency_contact,
            is_verified: self.is_verified,
            status: parse_enum(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_HOSPITAL: &str = "SELECT meta::id(id) AS record_id, * FROM";

/// SurrealDB implementation of the Hospital repository.
#[derive(Clone)]
pub struct SurrealHospitalRepository<C: Connection> {
    db: Surreal<C>,
    pepper: Option<String>,
}

impl<C: Connection> SurrealHospitalRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: Option<String>) -> Self {
        Self { db, pepper }
    }

    async fn fetch_one(&self, id: Uuid) -> Result<Hospital, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(format!("{SELECT_HOSPITAL} type::record('hospital', $id)"))
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<HospitalRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "hospital".into(),
            id: id_str,
        })?;
        row.try_into_hospital()
    }
}

impl<C: Connection> HospitalRepository for SurrealHospitalRepository<C> {
    async fn create(&self, input: CreateHospital) -> CoreResult<Hospital> {
        let id = Uuid::new_v4();
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;

        self.db
            .query(
                "CREATE type::record('hospital', $id) SET \
                 name = $name, email = $email, phone = $phone, \
                 password_hash = $password_hash, \
                 registration_number = $registration_number, \
                 address = $address, location = $location, \
                 specialities = $specialities, \
                 emergency_contact = $emergency_contact, \
                 is_verified = false, status = 'Active'",
            )
            .bind(("id", id.to_string()))
            .bind(("name", input.name))
            .bind(("email", input.email.to_lowercase()))
            .bind(("phone", input.phone))
            .bind(("password_hash", password_hash))
            .bind(("registration_number", input.registration_number))
            .bind(("address", to_json(&input.address)?))
            .bind(("location", to_json_opt(&input.location)?))
            .bind(("specialities", to_json(&input.specialities)?))
            .bind(("emergency_contact", input.emergency_contact))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("hospital", e))?;

        Ok(self.fetch_one(id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> CoreResult<Hospital> {
        Ok(self.fetch_one(id).await?)
    }

    async fn get_by_email(&self, email: &str) -> CoreResult<Hospital> {
        let email = email.to_lowercase();
        let mut result = self
            .db
            .query(format!("{SELECT_HOSPITAL} hospital WHERE email = $email"))
            .bind(("email", email.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HospitalRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "hospital".into(),
            id: format!("email={email}"),
        })?;
        Ok(row.try_into_hospital()?)
    }

    async fn update(&self, id: Uuid, input: UpdateHospital) -> CoreResult<Hospital> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.specialities.is_some() {
            sets.push("specialities = $specialities");
        }
        if input.is_verified.is_some() {
            sets.push("is_verified = $is_verified");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('hospital', $id) SET {} RETURN NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(phone) = input.phone {
            builder = builder.bind(("phone", phone));
        }
        if let Some(specialities) = input.specialities {
            builder = builder.bind(("specialities", to_json(&specialities)?));
        }
        if let Some(is_verified) = input.is_verified {
            builder = builder.bind(("is_verified", is_verified));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("hospital", e))?;

        Ok(self.fetch_one(id).await?)
    }

    async fn list(&self, pagination: Pagination) -> CoreResult<PaginatedResult<Hospital>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM hospital GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "{SELECT_HOSPITAL} hospital ORDER BY created_at ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HospitalRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(HospitalRow::try_into_hospital)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
