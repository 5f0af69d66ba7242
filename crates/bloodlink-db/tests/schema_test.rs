//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    bloodlink_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in [
        "user",
        "hospital",
        "ngo",
        "session",
        "resource",
        "request",
        "center",
        "appointment",
        "donation",
        "audit_log",
        "_migration",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    bloodlink_db::run_migrations(&db).await.unwrap();
    bloodlink_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn unique_index_prevents_duplicate_emails() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    bloodlink_db::run_migrations(&db).await.unwrap();

    let create = "CREATE user SET name = 'A', email = 'a@example.com', \
                  phone = '9876543210', password_hash = 'x', \
                  role = 'Donor', status = 'Active'";

    db.query(create).await.unwrap().check().unwrap();
    let result = db.query(create).await.unwrap().check();

    assert!(result.is_err(), "duplicate email should be rejected");
}

#[tokio::test]
async fn request_status_must_be_a_known_value() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    bloodlink_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE request SET \
             requester = { id: 'r', entity_type: 'NGO' }, \
             resource_id = 'x', resource_kind = 'equipment', \
             quantity = { requested: 1 }, duration = {}, \
             status = { current: 'LOST', history: [] }, \
             priority = 'low', purpose = 'ten chars or more'",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "unknown request status should be rejected");
}

#[tokio::test]
async fn audit_log_accepts_appended_entries() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    bloodlink_db::run_migrations(&db).await.unwrap();

    db.query(
        "CREATE audit_log:one SET actor_id = 'a', actor_type = 'Admin', \
         action = 'resource.verified', entity_type = 'resource', \
         entity_id = 'e', outcome = 'Success'",
    )
    .await
    .unwrap()
    .check()
    .unwrap();

    let mut result = db
        .query("SELECT * FROM audit_log WHERE action = 'resource.verified'")
        .await
        .unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1);
}
