//! Audit log domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::Role;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

string_enum!(AuditOutcome {
    Success => "Success",
    Failure => "Failure",
    Denied => "Denied",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub actor_type: Role,
    /// Dotted action name, e.g. `request.status.approved`.
    pub action: String,
    /// Collection of the affected document (`request`, `resource`, ...).
    pub entity_type: String,
    pub entity_id: Uuid,
    pub outcome: AuditOutcome,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditLogEntry {
    pub actor_id: Uuid,
    pub actor_type: Role,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub outcome: AuditOutcome,
    pub metadata: Option<serde_json::Value>,
}
