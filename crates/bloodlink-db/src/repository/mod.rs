//! SurrealDB repository implementations.
//!
//! Each repository reads rows into a private `*Row` struct (with the record
//! key projected as `record_id`) and converts them into the domain type.
//! Embedded sub-documents travel as JSON values.

mod appointment;
mod audit;
mod center;
mod donation;
mod hospital;
mod ngo;
mod request;
mod resource;
mod session;
mod user;

pub use appointment::SurrealAppointmentRepository;
pub use audit::SurrealAuditLogRepository;
pub use center::SurrealCenterRepository;
pub use donation::SurrealDonationRepository;
pub use hospital::SurrealHospitalRepository;
pub use ngo::SurrealNgoRepository;
pub use request::SurrealRequestRepository;
pub use resource::SurrealResourceRepository;
pub use session::SurrealSessionRepository;
pub use user::SurrealUserRepository;

use std::str::FromStr;

use bloodlink_core::models::common::{EntityRef, EntityType};
use serde::Serialize;
use serde::de::DeserializeOwned;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub total: u64,
}

/// Row struct for `count()` queries grouped by status.
#[derive(Debug, SurrealValue)]
pub(crate) struct StatusCountRow {
    pub current: String,
    pub total: u64,
}

pub(crate) fn parse_status_counts<T>(rows: Vec<StatusCountRow>) -> Result<Vec<(T, u64)>, DbError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    rows.into_iter()
        .map(|row| Ok((parse_enum(&row.current)?, row.total)))
        .collect()
}

/// Row struct for compare-and-set updates that `RETURN version`.
#[derive(Debug, SurrealValue)]
pub(crate) struct VersionRow {
    #[allow(dead_code)]
    pub version: u64,
}

pub(crate) fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Codec(format!("invalid {what} UUID: {e}")))
}

pub(crate) fn parse_enum<T>(value: &str) -> Result<T, DbError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| DbError::Codec(e.to_string()))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, DbError> {
    Ok(serde_json::to_value(value)?)
}

/// `None` binds as `NONE` rather than JSON `null`, which `option<…>`
/// fields reject.
pub(crate) fn to_json_opt<T: Serialize>(
    value: &Option<T>,
) -> Result<Option<serde_json::Value>, DbError> {
    value.as_ref().map(to_json).transpose()
}

pub(crate) fn from_json<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, DbError> {
    Ok(serde_json::from_value(value)?)
}

pub(crate) fn from_json_opt<T: DeserializeOwned>(
    value: Option<serde_json::Value>,
) -> Result<Option<T>, DbError> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => from_json(v).map(Some),
    }
}

/// Stored form of an [`EntityRef`]: `{id: string, entity_type: string}`.
pub(crate) fn entity_ref_json(entity: EntityRef) -> serde_json::Value {
    serde_json::json!({
        "id": entity.id.to_string(),
        "entity_type": entity.entity_type.as_str(),
    })
}

pub(crate) fn entity_type_str(entity_type: EntityType) -> String {
    entity_type.as_str().to_string()
}
