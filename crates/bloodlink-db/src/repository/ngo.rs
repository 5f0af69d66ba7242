//! SurrealDB implementation of [`NgoRepository`].

use bloodlink_core::error::CoreResult;
use bloodlink_core::models::ngo::{CreateNgo, Ngo, UpdateNgo};
use bloodlink_core::repository::{NgoRepository, PaginatedResult, Pagination};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, from_json, from_json_opt, parse_enum, parse_uuid, to_json, to_json_opt};
use crate::error::DbError;
use crate::password::hash_password;

#[derive(Debug, SurrealValue)]
struct NgoRow {
    record_id: String,
    name: String,
    email: String,
    phone: String,
    password_hash: String,
    registration_number: String,
    address: serde_json::Value,
    location: Option<serde_json::Value>,
    contact_person: String,
    facilities: serde_json::Value,
    is_verified: bool,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl NgoRow {
    fn try_into_ngo(self) -> Result<Ngo, DbError> {
        Ok(Ngo {
            id: parse_uuid(&self.record_id, "ngo")?,
            name: self.name,
            email: self.email,
            phone: self.phone,
            password_hash: self.password_hash,
            registration_number: self.registration_number,
            address: from_json(self.address)?,
            location: from_json_opt(self.location)?,
            contact_person: self.contact_person,
            facilities: from_json(self.facilities)?,
            is_verified: self.is_verified,
            status: parse_enum(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_NGO: &str = "SELECT meta::id(id) AS record_id, * FROM";

/// SurrealDB implementation of the NGO repository.
#[derive(Clone)]
pub struct SurrealNgoRepository<C: Connection> {
    db: Surreal<C>,
    pepper: Option<String>,
}

impl<C: Connection> SurrealNgoRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: Option<String>) -> Self {
        Self { db, pepper }
    }

    async fn fetch_one(&self, id: Uuid) -> Result<Ngo, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(format!("{SELECT_NGO} type::record('ngo', $id)"))
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<NgoRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "ngo".into(),
            id: id_str,
        })?;
        row.try_into_ngo()
    }
}

impl<C: Connection> NgoRepository for SurrealNgoRepository<C> {
    async fn create(&self, input: CreateNgo) -> CoreResult<Ngo> {
        let id = Uuid::new_v4();
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;

        self.db
            .query(
                "CREATE type::record('ngo', $id) SET \
                 name = $name, email = $email, phone = $phone, \
                 password_hash = $password_hash, \
                 registration_number = $registration_number, \
                 address = $address, location = $location, \
                 contact_person = $contact_person, \
                 facilities = $facilities, \
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
            .bind(("contact_person", input.contact_person))
            .bind(("facilities", to_json(&input.facilities)?))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("ngo", e))?;

        Ok(self.fetch_one(id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> CoreResult<Ngo> {
        Ok(self.fetch_one(id).await?)
    }

    async fn get_by_email(&self, email: &str) -> CoreResult<Ngo> {
        let email = email.to_lowercase();
        let mut result = self
            .db
            .query(format!("{SELECT_NGO} ngo WHERE email = $email"))
            .bind(("email", email.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<NgoRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "ngo".into(),
            id: format!("email={email}"),
        })?;
        Ok(row.try_into_ngo()?)
    }

    async fn update(&self, id: Uuid, input: UpdateNgo) -> CoreResult<Ngo> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.contact_person.is_some() {
            sets.push("contact_person = $contact_person");
        }
        if input.facilities.is_some() {
            sets.push("facilities = $facilities");
        }
        if input.is_verified.is_some() {
            sets.push("is_verified = $is_verified");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('ngo', $id) SET {} RETURN NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(phone) = input.phone {
            builder = builder.bind(("phone", phone));
        }
        if let Some(contact_person) = input.contact_person {
            builder = builder.bind(("contact_person", contact_person));
        }
        if let Some(facilities) = input.facilities {
            builder = builder.bind(("facilities", to_json(&facilities)?));
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
            .map_err(|e| DbError::from_statement("ngo", e))?;

        Ok(self.fetch_one(id).await?)
    }

    async fn list(&self, pagination: Pagination) -> CoreResult<PaginatedResult<Ngo>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM ngo GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "{SELECT_NGO} ngo ORDER BY created_at ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<NgoRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(NgoRow::try_into_ngo)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
