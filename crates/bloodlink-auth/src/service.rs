//! Authentication service: registration, login, refresh rotation and
//! logout for every account kind.

use bloodlink_core::error::{CoreError, CoreResult};
use bloodlink_core::models::common::{AccountStatus, Actor, EntityType, Role};
use bloodlink_core::models::hospital::{CreateHospital, Hospital};
use bloodlink_core::models::ngo::{CreateNgo, Ngo};
use bloodlink_core::models::session::CreateSession;
use bloodlink_core::models::user::{CreateUser, User, UserRole};
use bloodlink_core::repository::{
    HospitalRepository, NgoRepository, SessionRepository, UserRepository,
};
use bloodlink_core::validation::check_password_length;
use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A freshly issued token pair.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed JWT access token.
    pub access_token: String,
    /// Raw opaque refresh token (return to client, not stored).
    pub refresh_token: String,
    /// Session ID backing the refresh token.
    pub session_id: Uuid,
    pub account_id: Uuid,
    pub role: Role,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Input for the refresh token rotation flow.
#[derive(Debug)]
pub struct RefreshInput {
    pub raw_refresh_token: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// The parts of an account login needs, whatever collection it lives in.
struct Credentials {
    id: Uuid,
    role: Role,
    password_hash: String,
    status: AccountStatus,
}

impl From<User> for Credentials {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            role: user.role.into(),
            password_hash: user.password_hash,
            status: user.status,
        }
    }
}

impl From<Hospital> for Credentials {
    fn from(hospital: Hospital) -> Self {
        Self {
            id: hospital.id,
            role: Role::Hospital,
            password_hash: hospital.password_hash,
            status: hospital.status,
        }
    }
}

impl From<Ngo> for Credentials {
    fn from(ngo: Ngo) -> Self {
        Self {
            id: ngo.id,
            role: Role::Ngo,
            password_hash: ngo.password_hash,
            status: ngo.status,
        }
    }
}

fn check_status(status: AccountStatus) -> Result<(), AuthError> {
    match status {
        AccountStatus::Active => Ok(()),
        AccountStatus::Inactive => Err(AuthError::AccountInactive),
        AccountStatus::Suspended => Err(AuthError::AccountSuspended),
    }
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<U, H, N, S> {
    users: U,
    hospitals: H,
    ngos: N,
    sessions: S,
    config: AuthConfig,
}

impl<U, H, N, S> AuthService<U, H, N, S>
where
    U: UserRepository,
    H: HospitalRepository,
    N: NgoRepository,
    S: SessionRepository,
{
    pub fn new(users: U, hospitals: H, ngos: N, sessions: S, config: AuthConfig) -> Self {
        Self {
            users,
            hospitals,
            ngos,
            sessions,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Register a donor, or an administrator when `registrar` is one.
    pub async fn register_user(
        &self,
        input: CreateUser,
        registrar: Option<&Actor>,
    ) -> CoreResult<User> {
        if input.role == UserRole::Admin && !registrar.is_some_and(Actor::is_admin) {
            return Err(CoreError::denied(
                "only an administrator can create administrator accounts",
            ));
        }
        input.validate()?;
        check_password_length(&input.password, self.config.min_password_length)?;
        let user = self.users.create(input).await?;
        info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    pub async fn register_hospital(&self, input: CreateHospital) -> CoreResult<Hospital> {
        input.validate()?;
        check_password_length(&input.password, self.config.min_password_length)?;
        let hospital = self.hospitals.create(input).await?;
        info!(hospital_id = %hospital.id, "hospital registered");
        Ok(hospital)
    }

    pub async fn register_ngo(&self, input: CreateNgo) -> CoreResult<Ngo> {
        input.validate()?;
        check_password_length(&input.password, self.config.min_password_length)?;
        let ngo = self.ngos.create(input).await?;
        info!(ngo_id = %ngo.id, "ngo registered");
        Ok(ngo)
    }

    /// Create the administrator described by `input` unless an account
    /// with that email already exists. Used to seed a fresh deployment.
    pub async fn ensure_admin(&self, mut input: CreateUser) -> CoreResult<Option<User>> {
        match self.users.get_by_email(&input.email).await {
            Ok(_) => return Ok(None),
            Err(CoreError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        input.role = UserRole::Admin;
        input.validate()?;
        check_password_length(&input.password, self.config.min_password_length)?;
        let admin = self.users.create(input).await?;
        info!(user_id = %admin.id, "bootstrap administrator created");
        Ok(Some(admin))
    }

    async fn credentials_by_email(
        &self,
        kind: EntityType,
        email: &str,
    ) -> CoreResult<Credentials> {
        match kind {
            EntityType::User => self.users.get_by_email(email).await.map(Into::into),
            EntityType::Hospital => self.hospitals.get_by_email(email).await.map(Into::into),
            EntityType::Ngo => self.ngos.get_by_email(email).await.map(Into::into),
        }
    }

    async fn credentials_by_id(&self, kind: EntityType, id: Uuid) -> CoreResult<Credentials> {
        match kind {
            EntityType::User => self.users.get_by_id(id).await.map(Into::into),
            EntityType::Hospital => self.hospitals.get_by_id(id).await.map(Into::into),
            EntityType::Ngo => self.ngos.get_by_id(id).await.map(Into::into),
        }
    }

    /// Authenticate an account of the given kind by email and password
    /// and issue a token pair.
    pub async fn login(&self, kind: EntityType, input: LoginInput) -> CoreResult<LoginOutput> {
        let email = input.email.trim().to_lowercase();
        let account = match self.credentials_by_email(kind, &email).await {
            Ok(account) => account,
            Err(CoreError::NotFound { .. }) => {
                password::burn_verification(&input.password);
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        let valid = password::verify_password(
            &input.password,
            &account.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            warn!(account_id = %account.id, kind = %kind, "login rejected: bad password");
            return Err(AuthError::InvalidCredentials.into());
        }

        check_status(account.status)?;

        let output = self
            .start_session(account.id, account.role, input.ip_address, input.user_agent)
            .await?;
        info!(account_id = %account.id, role = %account.role, "login succeeded");
        Ok(output)
    }

    /// Rotate a refresh token: consume the old one, verify the account
    /// is still active, and issue a new token pair.
    ///
    /// Each refresh token is single-use: the old session is deleted in one
    /// step before the new one is created, so a replayed token fails.
    pub async fn refresh(&self, input: RefreshInput) -> CoreResult<LoginOutput> {
        let token_hash = token::hash_refresh_token(&input.raw_refresh_token);
        let session = self
            .sessions
            .consume_by_token_hash(&token_hash)
            .await
            .map_err(|e| match e {
                CoreError::NotFound { .. } => {
                    AuthError::TokenInvalid("refresh token not found or already used".into())
                        .into()
                }
                other => other,
            })?;

        if session.expires_at <= Utc::now() {
            return Err(AuthError::TokenExpired.into());
        }

        let account = self
            .credentials_by_id(session.role.entity_type(), session.account_id)
            .await
            .map_err(|e| match e {
                CoreError::NotFound { .. } => {
                    AuthError::TokenInvalid("account no longer exists".into()).into()
                }
                other => other,
            })?;
        check_status(account.status)?;

        self.start_session(account.id, account.role, input.ip_address, input.user_agent)
            .await
    }

    /// Invalidate the session behind a refresh token. Unknown tokens are
    /// ignored so logout is idempotent.
    pub async fn logout(&self, raw_refresh_token: &str) -> CoreResult<()> {
        let token_hash = token::hash_refresh_token(raw_refresh_token);
        match self.sessions.consume_by_token_hash(&token_hash).await {
            Ok(_) | Err(CoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Revoke every session the actor holds.
    pub async fn revoke_all_sessions(&self, actor: &Actor) -> CoreResult<()> {
        self.sessions
            .invalidate_account_sessions(actor.id, actor.role)
            .await
    }

    async fn start_session(
        &self,
        account_id: Uuid,
        role: Role,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> CoreResult<LoginOutput> {
        let raw_refresh = token::generate_refresh_token();
        let expires_at =
            Utc::now() + Duration::seconds(self.config.refresh_token_lifetime_secs as i64);

        let session = self
            .sessions
            .create(CreateSession {
                account_id,
                role,
                token_hash: token::hash_refresh_token(&raw_refresh),
                ip_address,
                user_agent,
                expires_at,
            })
            .await?;

        let access_token = token::issue_access_token(account_id, role, &self.config)?;

        Ok(LoginOutput {
            access_token,
            refresh_token: raw_refresh,
            session_id: session.id,
            account_id,
            role,
            expires_in: self.config.access_token_lifetime_secs,
        })
    }
}
