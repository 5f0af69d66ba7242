//! Shared fixtures for the in-memory SurrealDB integration tests.

#![allow(dead_code)]

use bloodlink_core::models::common::{Actor, Address, GeoPoint, Role};
use bloodlink_core::models::hospital::CreateHospital;
use bloodlink_core::models::ngo::CreateNgo;
use bloodlink_core::models::resource::{CreateResource, EquipmentCondition, ResourceDetails};
use bloodlink_core::models::user::{CreateUser, UserRole};
use bloodlink_core::repository::{HospitalRepository, NgoRepository, UserRepository};
use bloodlink_db::repository::{
    SurrealHospitalRepository, SurrealNgoRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

/// Spin up an in-memory DB with migrations applied.
pub async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    bloodlink_db::run_migrations(&db).await.unwrap();
    db
}

pub fn address() -> Address {
    Address {
        street: "12 MG Road".into(),
        city: "Bengaluru".into(),
        state: "Karnataka".into(),
        pin_code: "560001".into(),
    }
}

pub fn bengaluru() -> GeoPoint {
    GeoPoint::new(77.5946, 12.9716)
}

pub async fn hospital(db: &Surreal<Db>, email: &str) -> Actor {
    let repo = SurrealHospitalRepository::new(db.clone());
    let hospital = repo
        .create(CreateHospital {
            name: "City General".into(),
            email: email.into(),
            phone: "9876543210".into(),
            password: "hospital-pass-1".into(),
            registration_number: format!("REG-{email}"),
            address: address(),
            location: Some(bengaluru()),
            specialities: vec!["cardiology".into()],
            emergency_contact: None,
        })
        .await
        .unwrap();
    Actor::new(hospital.id, Role::Hospital)
}

pub async fn ngo(db: &Surreal<Db>, email: &str) -> Actor {
    let repo = SurrealNgoRepository::new(db.clone());
    let ngo = repo
        .create(CreateNgo {
            name: "Helping Hands".into(),
            email: email.into(),
            phone: "9123456780".into(),
            password: "ngo-pass-1234".into(),
            registration_number: format!("NGO-{email}"),
            address: address(),
            location: None,
            contact_person: "Asha Rao".into(),
            facilities: vec![],
        })
        .await
        .unwrap();
    Actor::new(ngo.id, Role::Ngo)
}

pub async fn user(db: &Surreal<Db>, email: &str, role: UserRole) -> Actor {
    let repo = SurrealUserRepository::new(db.clone());
    let user = repo
        .create(CreateUser {
            name: "Ravi Kumar".into(),
            email: email.into(),
            phone: "9988776655".into(),
            password: "donor-pass-123".into(),
            role,
            blood_group: None,
            date_of_birth: None,
            address: Some(address()),
            location: None,
        })
        .await
        .unwrap();
    Actor::new(user.id, role.into())
}

pub fn ventilator() -> CreateResource {
    CreateResource {
        name: "Portable ventilator".into(),
        description: Some("ICU grade".into()),
        details: ResourceDetails::Equipment {
            category: "respiratory".into(),
            manufacturer: Some("Acme Medical".into()),
            model: None,
            serial_number: Some("SN-001".into()),
            condition: EquipmentCondition::Good,
        },
        quantity: 2,
        location: Some(bengaluru()),
    }
}
