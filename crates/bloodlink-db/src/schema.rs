//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. UUIDs are stored as strings and enums as
//! strings with ASSERT constraints. Embedded sub-documents (addresses,
//! GeoJSON points, status blocks with their history) are FLEXIBLE objects
//! so the stored shape tracks the domain types.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users (donors and administrators)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD phone ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['Donor', 'Admin'];
DEFINE FIELD blood_group ON TABLE user TYPE option<string> \
    ASSERT $value IS NONE OR $value IN \
    ['A+', 'A-', 'B+', 'B-', 'AB+', 'AB-', 'O+', 'O-'];
DEFINE FIELD date_of_birth ON TABLE user TYPE option<string>;
DEFINE FIELD address ON TABLE user TYPE option<object> FLEXIBLE;
DEFINE FIELD location ON TABLE user TYPE option<object> FLEXIBLE;
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['Active', 'Inactive', 'Suspended'];
DEFINE FIELD last_donation_date ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Hospitals
-- =======================================================================
DEFINE TABLE hospital SCHEMAFULL;
DEFINE FIELD name ON TABLE hospital TYPE string;
DEFINE FIELD email ON TABLE hospital TYPE string;
DEFINE FIELD phone ON TABLE hospital TYPE string;
DEFINE FIELD password_hash ON TABLE hospital TYPE string;
DEFINE FIELD registration_number ON TABLE hospital TYPE string;
DEFINE FIELD address ON TABLE hospital TYPE object FLEXIBLE;
DEFINE FIELD location ON TABLE hospital TYPE option<object> FLEXIBLE;
DEFINE FIELD specialities ON TABLE hospital TYPE array DEFAULT [];
DEFINE FIELD specialities.* ON TABLE hospital TYPE string;
DEFINE FIELD emergency_contact ON TABLE hospital TYPE option<string>;
DEFINE FIELD is_verified ON TABLE hospital TYPE bool DEFAULT false;
DEFINE FIELD status ON TABLE hospital TYPE string \
    ASSERT $value IN ['Active', 'Inactive', 'Suspended'];
DEFINE FIELD created_at ON TABLE hospital TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE hospital TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_hospital_email ON TABLE hospital COLUMNS email UNIQUE;
DEFINE INDEX idx_hospital_registration ON TABLE hospital \
    COLUMNS registration_number UNIQUE;

-- =======================================================================
-- NGOs
-- =======================================================================
DEFINE TABLE ngo SCHEMAFULL;
DEFINE FIELD name ON TABLE ngo TYPE string;
DEFINE FIELD email ON TABLE ngo TYPE string;
DEFINE FIELD phone ON TABLE ngo TYPE string;
DEFINE FIELD password_hash ON TABLE ngo TYPE string;
DEFINE FIELD registration_number ON TABLE ngo TYPE string;
DEFINE FIELD address ON TABLE ngo TYPE object FLEXIBLE;
DEFINE FIELD location ON TABLE ngo TYPE option<object> FLEXIBLE;
DEFINE FIELD contact_person ON TABLE ngo TYPE string;
DEFINE FIELD facilities ON TABLE ngo TYPE array DEFAULT [];
DEFINE FIELD facilities.* ON TABLE ngo TYPE string;
DEFINE FIELD is_verified ON TABLE ngo TYPE bool DEFAULT false;
DEFINE FIELD status ON TABLE ngo TYPE string \
    ASSERT $value IN ['Active', 'Inactive', 'Suspended'];
DEFINE FIELD created_at ON TABLE ngo TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE ngo TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_ngo_email ON TABLE ngo COLUMNS email UNIQUE;
DEFINE INDEX idx_ngo_registration ON TABLE ngo \
    COLUMNS registration_number UNIQUE;

-- =======================================================================
-- Sessions (refresh tokens, stored hashed)
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD account_id ON TABLE session TYPE string;
DEFINE FIELD role ON TABLE session TYPE string \
    ASSERT $value IN ['Donor', 'Hospital', 'NGO', 'Admin'];
DEFINE FIELD token_hash ON TABLE session TYPE string;
DEFINE FIELD ip_address ON TABLE session TYPE option<string>;
DEFINE FIELD user_agent ON TABLE session TYPE option<string>;
DEFINE FIELD expires_at ON TABLE session TYPE datetime;
DEFINE FIELD created_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_session_token ON TABLE session \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_session_account ON TABLE session \
    COLUMNS account_id, role;

-- =======================================================================
-- Resources (equipment and medicine)
-- =======================================================================
DEFINE TABLE resource SCHEMAFULL;
DEFINE FIELD name ON TABLE resource TYPE string;
DEFINE FIELD description ON TABLE resource TYPE option<string>;
DEFINE FIELD owner ON TABLE resource TYPE object;
DEFINE FIELD owner.id ON TABLE resource TYPE string;
DEFINE FIELD owner.entity_type ON TABLE resource TYPE string \
    ASSERT $value IN ['User', 'Hospital', 'NGO'];
DEFINE FIELD kind ON TABLE resource TYPE string \
    ASSERT $value IN ['equipment', 'medicine'];
DEFINE FIELD details ON TABLE resource TYPE object FLEXIBLE;
DEFINE FIELD quantity ON TABLE resource TYPE int ASSERT $value >= 0;
DEFINE FIELD location ON TABLE resource TYPE option<object> FLEXIBLE;
DEFINE FIELD status ON TABLE resource TYPE object FLEXIBLE;
DEFINE FIELD status.current ON TABLE resource TYPE string \
    ASSERT $value IN ['available', 'in_use', 'maintenance', \
    'disposed', 'expired', 'reserved'];
DEFINE FIELD is_verified ON TABLE resource TYPE bool DEFAULT false;
DEFINE FIELD version ON TABLE resource TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE resource TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE resource TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_resource_owner ON TABLE resource \
    COLUMNS owner.id, owner.entity_type;
DEFINE INDEX idx_resource_status ON TABLE resource \
    COLUMNS status.current;

-- =======================================================================
-- Requests (resource-sharing workflow)
-- =======================================================================
DEFINE TABLE request SCHEMAFULL;
DEFINE FIELD requester ON TABLE request TYPE object;
DEFINE FIELD requester.id ON TABLE request TYPE string;
DEFINE FIELD requester.entity_type ON TABLE request TYPE string \
    ASSERT $value IN ['Hospital', 'NGO'];
DEFINE FIELD resource_id ON TABLE request TYPE string;
DEFINE FIELD resource_kind ON TABLE request TYPE string \
    ASSERT $value IN ['equipment', 'medicine'];
DEFINE FIELD quantity ON TABLE request TYPE object FLEXIBLE;
DEFINE FIELD duration ON TABLE request TYPE object FLEXIBLE;
DEFINE FIELD status ON TABLE request TYPE object FLEXIBLE;
DEFINE FIELD status.current ON TABLE request TYPE string \
    ASSERT $value IN ['PENDING', 'APPROVED', 'REJECTED', \
    'CANCELLED', 'COMPLETED', 'EXPIRED'];
DEFINE FIELD priority ON TABLE request TYPE string \
    ASSERT $value IN ['low', 'medium', 'high', 'urgent'];
DEFINE FIELD purpose ON TABLE request TYPE string \
    ASSERT string::len($value) >= 10 AND string::len($value) <= 500;
DEFINE FIELD location ON TABLE request TYPE option<object> FLEXIBLE;
DEFINE FIELD approval ON TABLE request TYPE option<object> FLEXIBLE;
DEFINE FIELD communications ON TABLE request TYPE array DEFAULT [];
DEFINE FIELD communications.* ON TABLE request TYPE object;
DEFINE FIELD communications.*.sender ON TABLE request TYPE object;
DEFINE FIELD communications.*.sender.id ON TABLE request TYPE string;
DEFINE FIELD communications.*.sender.entity_type ON TABLE request \
    TYPE string;
DEFINE FIELD communications.*.message ON TABLE request TYPE string;
DEFINE FIELD communications.*.attachments ON TABLE request \
    TYPE array DEFAULT [];
DEFINE FIELD communications.*.attachments.* ON TABLE request \
    TYPE string;
DEFINE FIELD communications.*.timestamp ON TABLE request TYPE string;
DEFINE FIELD version ON TABLE request TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE request TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE request TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_request_resource_status ON TABLE request \
    COLUMNS resource_id, status.current;
DEFINE INDEX idx_request_requester ON TABLE request \
    COLUMNS requester.id, requester.entity_type;

-- =======================================================================
-- Donation centers
-- =======================================================================
DEFINE TABLE center SCHEMAFULL;
DEFINE FIELD name ON TABLE center TYPE string;
DEFINE FIELD operator ON TABLE center TYPE object;
DEFINE FIELD operator.id ON TABLE center TYPE string;
DEFINE FIELD operator.entity_type ON TABLE center TYPE string \
    ASSERT $value IN ['Hospital', 'NGO'];
DEFINE FIELD address ON TABLE center TYPE object FLEXIBLE;
DEFINE FIELD location ON TABLE center TYPE object FLEXIBLE;
DEFINE FIELD operating_hours ON TABLE center TYPE option<string>;
DEFINE FIELD contact_phone ON TABLE center TYPE string;
DEFINE FIELD inventory ON TABLE center TYPE array DEFAULT [];
DEFINE FIELD inventory.* ON TABLE center TYPE object;
DEFINE FIELD inventory.*.blood_group ON TABLE center TYPE string;
DEFINE FIELD inventory.*.available ON TABLE center TYPE int \
    ASSERT $value >= 0;
DEFINE FIELD inventory.*.last_updated ON TABLE center TYPE string;
DEFINE FIELD version ON TABLE center TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE center TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE center TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_center_operator ON TABLE center \
    COLUMNS operator.id, operator.entity_type;

-- =======================================================================
-- Donation appointments
-- =======================================================================
DEFINE TABLE appointment SCHEMAFULL;
DEFINE FIELD donor_id ON TABLE appointment TYPE string;
DEFINE FIELD center_id ON TABLE appointment TYPE string;
DEFINE FIELD scheduled_at ON TABLE appointment TYPE datetime;
DEFINE FIELD blood_group ON TABLE appointment TYPE option<string>;
DEFINE FIELD status ON TABLE appointment TYPE string \
    ASSERT $value IN ['Scheduled', 'Completed', 'Cancelled', 'NoShow'];
DEFINE FIELD notes ON TABLE appointment TYPE option<string>;
DEFINE FIELD version ON TABLE appointment TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE appointment TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE appointment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_appointment_donor ON TABLE appointment \
    COLUMNS donor_id, scheduled_at;

-- =======================================================================
-- Recorded donations
-- =======================================================================
DEFINE TABLE donation SCHEMAFULL;
DEFINE FIELD donor_id ON TABLE donation TYPE string;
DEFINE FIELD center_id ON TABLE donation TYPE string;
DEFINE FIELD appointment_id ON TABLE donation TYPE option<string>;
DEFINE FIELD blood_group ON TABLE donation TYPE string;
DEFINE FIELD units ON TABLE donation TYPE int \
    ASSERT $value >= 1 AND $value <= 4;
DEFINE FIELD donated_at ON TABLE donation TYPE datetime;
DEFINE FIELD notes ON TABLE donation TYPE option<string>;
DEFINE FIELD created_at ON TABLE donation TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_donation_donor ON TABLE donation \
    COLUMNS donor_id, donated_at;

-- =======================================================================
-- Audit Log (append-only)
-- =======================================================================
DEFINE TABLE audit_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD actor_id ON TABLE audit_log TYPE string;
DEFINE FIELD actor_type ON TABLE audit_log TYPE string \
    ASSERT $value IN ['Donor', 'Hospital', 'NGO', 'Admin'];
DEFINE FIELD action ON TABLE audit_log TYPE string;
DEFINE FIELD entity_type ON TABLE audit_log TYPE string;
DEFINE FIELD entity_id ON TABLE audit_log TYPE string;
DEFINE FIELD outcome ON TABLE audit_log TYPE string \
    ASSERT $value IN ['Success', 'Failure', 'Denied'];
DEFINE FIELD metadata ON TABLE audit_log TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD timestamp ON TABLE audit_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_time ON TABLE audit_log COLUMNS timestamp;
DEFINE INDEX idx_audit_actor ON TABLE audit_log COLUMNS actor_id;
DEFINE INDEX idx_audit_entity ON TABLE audit_log COLUMNS entity_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_is_nonempty() {
        assert!(!SCHEMA_V1.is_empty());
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
