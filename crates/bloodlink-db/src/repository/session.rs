//! SurrealDB implementation of [`SessionRepository`].

use bloodlink_core::error::CoreResult;
use bloodlink_core::models::common::Role;
use bloodlink_core::models::session::{CreateSession, Session};
use bloodlink_core::repository::SessionRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_enum, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SessionRow {
    record_id: String,
    account_id: String,
    role: String,
    token_hash: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl SessionRow {
    fn try_into_session(self) -> Result<Session, DbError> {
        Ok(Session {
            id: parse_uuid(&self.record_id, "session")?,
            account_id: parse_uuid(&self.account_id, "account")?,
            role: parse_enum(&self.role)?,
            token_hash: self.token_hash,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

/// Previous state of a session removed by a consuming delete.
#[derive(Debug, SurrealValue)]
struct ConsumedRow {
    #[allow(dead_code)]
    token_hash: String,
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: CreateSession) -> CoreResult<Session> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        self.db
            .query(
                "CREATE type::record('session', $id) SET \
                 account_id = $account_id, role = $role, \
                 token_hash = $token_hash, \
                 ip_address = $ip_address, user_agent = $user_agent, \
                 expires_at = $expires_at, created_at = $created_at \
                 RETURN NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("account_id", input.account_id.to_string()))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("token_hash", input.token_hash.clone()))
            .bind(("ip_address", input.ip_address.clone()))
            .bind(("user_agent", input.user_agent.clone()))
            .bind(("expires_at", input.expires_at))
            .bind(("created_at", created_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("session", e))?;

        Ok(Session {
            id,
            account_id: input.account_id,
            role: input.role,
            token_hash: input.token_hash,
            ip_address: input.ip_address,
            user_agent: input.user_agent,
            expires_at: input.expires_at,
            created_at,
        })
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> CoreResult<Session> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE token_hash = $token_hash",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: "token_hash".into(),
        })?;

        Ok(row.try_into_session()?)
    }

    async fn consume_by_token_hash(&self, token_hash: &str) -> CoreResult<Session> {
        let session = self.get_by_token_hash(token_hash).await?;

        // Only one caller gets the deleted row back; a concurrent consumer
        // of the same token sees an empty result.
        let mut result = self
            .db
            .query(
                "DELETE type::record('session', $id) \
                 WHERE token_hash = $token_hash RETURN BEFORE",
            )
            .bind(("id", session.id.to_string()))
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let deleted: Vec<ConsumedRow> = result.take(0).map_err(DbError::from)?;
        if deleted.is_empty() {
            return Err(DbError::NotFound {
                entity: "session".into(),
                id: "token_hash".into(),
            }
            .into());
        }

        Ok(session)
    }

    async fn invalidate_account_sessions(&self, account_id: Uuid, role: Role) -> CoreResult<()> {
        self.db
            .query("DELETE session WHERE account_id = $account_id AND role = $role")
            .bind(("account_id", account_id.to_string()))
            .bind(("role", role.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn cleanup_expired(&self) -> CoreResult<u64> {
        // Count expired sessions first, then delete.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM session \
                 WHERE expires_at < time::now() GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE session WHERE expires_at < time::now()")
            .await
            .map_err(DbError::from)?;

        Ok(total)
    }
}
