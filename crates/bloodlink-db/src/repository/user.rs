//! SurrealDB implementation of [`UserRepository`].

use bloodlink_core::error::CoreResult;
use bloodlink_core::models::user::{CreateUser, UpdateUser, User};
use bloodlink_core::repository::{PaginatedResult, Pagination, UserRepository};
use chrono::{DateTime, NaiveDate, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, from_json_opt, parse_enum, parse_uuid, to_json_opt};
use crate::error::DbError;
use crate::password::hash_password;

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    name: String,
    email: String,
    phone: String,
    password_hash: String,
    role: String,
    blood_group: Option<String>,
    date_of_birth: Option<String>,
    address: Option<serde_json::Value>,
    location: Option<serde_json::Value>,
    status: String,
    last_donation_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        let date_of_birth = self
            .date_of_birth
            .map(|d| {
                NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                    .map_err(|e| DbError::Codec(format!("invalid date_of_birth: {e}")))
            })
            .transpose()?;
        Ok(User {
            id: parse_uuid(&self.record_id, "user")?,
            name: self.name,
            email: self.email,
            phone: self.phone,
            password_hash: self.password_hash,
            role: parse_enum(&self.role)?,
            blood_group: self.blood_group.as_deref().map(parse_enum).transpose()?,
            date_of_birth,
            address: from_json_opt(self.address)?,
            location: from_json_opt(self.location)?,
            status: parse_enum(&self.status)?,
            last_donation_date: self.last_donation_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_USER: &str = "SELECT meta::id(id) AS record_id, * FROM";

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: Option<String>) -> Self {
        Self { db, pepper }
    }

    async fn fetch_one(&self, id: Uuid) -> Result<User, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(format!("{SELECT_USER} type::record('user', $id)"))
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<UserRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;
        row.try_into_user()
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> CoreResult<User> {
        let id = Uuid::new_v4();
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;

        self.db
            .query(
                "CREATE type::record('user', $id) SET \
                 name = $name, email = $email, phone = $phone, \
                 password_hash = $password_hash, role = $role, \
                 blood_group = $blood_group, \
                 date_of_birth = $date_of_birth, \
                 address = $address, location = $location, \
                 status = 'Active', last_donation_date = NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("name", input.name))
            .bind(("email", input.email.to_lowercase()))
            .bind(("phone", input.phone))
            .bind(("password_hash", password_hash))
            .bind(("role", input.role.as_str().to_string()))
            .bind((
                "blood_group",
                input.blood_group.map(|g| g.as_str().to_string()),
            ))
            .bind((
                "date_of_birth",
                input.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
            ))
            .bind(("address", to_json_opt(&input.address)?))
            .bind(("location", to_json_opt(&input.location)?))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("user", e))?;

        Ok(self.fetch_one(id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> CoreResult<User> {
        Ok(self.fetch_one(id).await?)
    }

    async fn get_by_email(&self, email: &str) -> CoreResult<User> {
        let email = email.to_lowercase();
        let mut result = self
            .db
            .query(format!("{SELECT_USER} user WHERE email = $email"))
            .bind(("email", email.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("email={email}"),
        })?;
        Ok(row.try_into_user()?)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> CoreResult<User> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.blood_group.is_some() {
            sets.push("blood_group = $blood_group");
        }
        if input.last_donation_date.is_some() {
            sets.push("last_donation_date = $last_donation_date");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {} RETURN NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(phone) = input.phone {
            builder = builder.bind(("phone", phone));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }
        if let Some(group) = input.blood_group {
            builder = builder.bind(("blood_group", group.as_str().to_string()));
        }
        if let Some(at) = input.last_donation_date {
            builder = builder.bind(("last_donation_date", at));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("user", e))?;

        Ok(self.fetch_one(id).await?)
    }

    async fn list(&self, pagination: Pagination) -> CoreResult<PaginatedResult<User>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM user GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "{SELECT_USER} user ORDER BY created_at ASC LIMIT $limit START $offset"
            ))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
