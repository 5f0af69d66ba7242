//! Shared application state handed to every handler.

use std::sync::Arc;

use bloodlink_auth::AuthService;
use bloodlink_core::lifecycle::TransitionPolicy;
use bloodlink_core::models::user::{CreateUser, UserRole};
use bloodlink_db::DbManager;
use bloodlink_db::repository::{
    SurrealAppointmentRepository, SurrealAuditLogRepository, SurrealCenterRepository,
    SurrealDonationRepository, SurrealHospitalRepository, SurrealNgoRepository,
    SurrealRequestRepository, SurrealResourceRepository, SurrealSessionRepository,
    SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

use crate::config::Config;

pub type Users = SurrealUserRepository<Any>;
pub type Hospitals = SurrealHospitalRepository<Any>;
pub type Ngos = SurrealNgoRepository<Any>;
pub type Sessions = SurrealSessionRepository<Any>;
pub type Auth = AuthService<Users, Hospitals, Ngos, Sessions>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<Auth>,
    pub users: Users,
    pub hospitals: Hospitals,
    pub ngos: Ngos,
    pub resources: SurrealResourceRepository<Any>,
    pub requests: SurrealRequestRepository<Any>,
    pub centers: SurrealCenterRepository<Any>,
    pub appointments: SurrealAppointmentRepository<Any>,
    pub donations: SurrealDonationRepository<Any>,
    pub audit: SurrealAuditLogRepository<Any>,
}

impl AppState {
    /// Connect to the database, apply migrations and seed the bootstrap
    /// administrator if one is configured.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let manager = DbManager::connect(&config.database).await?;
        bloodlink_db::run_migrations(manager.client()).await?;

        let state = Self::from_db(manager.client().clone(), config);
        if let Some(admin) = state.config.bootstrap_admin.clone() {
            state
                .auth
                .ensure_admin(CreateUser {
                    name: admin.name,
                    email: admin.email,
                    phone: admin.phone,
                    password: admin.password,
                    role: UserRole::Admin,
                    blood_group: None,
                    date_of_birth: None,
                    address: None,
                    location: None,
                })
                .await?;
        }
        Ok(state)
    }

    /// Build the state over an already-migrated connection.
    pub fn from_db(db: Surreal<Any>, config: Config) -> Self {
        let pepper = config.auth.pepper.clone();
        let users = SurrealUserRepository::with_pepper(db.clone(), pepper.clone());
        let hospitals = SurrealHospitalRepository::with_pepper(db.clone(), pepper.clone());
        let ngos = SurrealNgoRepository::with_pepper(db.clone(), pepper);
        let auth = AuthService::new(
            users.clone(),
            hospitals.clone(),
            ngos.clone(),
            SurrealSessionRepository::new(db.clone()),
            config.auth.clone(),
        );

        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            users,
            hospitals,
            ngos,
            resources: SurrealResourceRepository::new(db.clone()),
            requests: SurrealRequestRepository::new(db.clone()),
            centers: SurrealCenterRepository::new(db.clone()),
            appointments: SurrealAppointmentRepository::new(db.clone()),
            donations: SurrealDonationRepository::new(db.clone()),
            audit: SurrealAuditLogRepository::new(db),
        }
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        if self.config.workflow.strict_request_transitions {
            TransitionPolicy::Strict
        } else {
            TransitionPolicy::Permissive
        }
    }
}
