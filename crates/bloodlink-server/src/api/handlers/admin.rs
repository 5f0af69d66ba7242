//! Administrator endpoints: account verification and the audit trail.

use axum::extract::State;
use bloodlink_core::models::audit::AuditLogEntry;
use bloodlink_core::models::common::Role;
use bloodlink_core::models::hospital::Hospital;
use bloodlink_core::models::ngo::Ngo;
use bloodlink_core::repository::{AuditLogFilter, AuditLogRepository, PaginatedResult};
use bloodlink_core::workflow;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::pagination;
use crate::api::extractors::{ApiPath, ApiQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::state::AppState;

pub async fn verify_hospital(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Hospital>> {
    let actor = user.require(&[Role::Admin])?;
    let hospital = workflow::verify_hospital(&state.hospitals, &state.audit, actor, id).await?;
    Ok(ApiResponse::ok(hospital, "Hospital verified"))
}

pub async fn verify_ngo(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Ngo>> {
    let actor = user.require(&[Role::Admin])?;
    let ngo = workflow::verify_ngo(&state.ngos, &state.audit, actor, id).await?;
    Ok(ApiResponse::ok(ngo, "NGO verified"))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
    pub entity_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

pub async fn list_audit(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<AuditQuery>,
) -> ApiResult<ApiResponse<PaginatedResult<AuditLogEntry>>> {
    user.require(&[Role::Admin])?;
    let entries = state
        .audit
        .list(
            AuditLogFilter {
                actor_id: query.actor_id,
                action: query.action,
                entity_id: query.entity_id,
                from: query.from,
                to: query.to,
            },
            pagination(query.offset, query.limit),
        )
        .await?;
    Ok(ApiResponse::ok(entries, "Audit log fetched"))
}
