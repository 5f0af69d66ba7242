//! Resource registration, listing, status changes and pending-request
//! review.

use axum::extract::State;
use bloodlink_core::models::common::{EntityRef, EntityType, Role};
use bloodlink_core::models::request::Request;
use bloodlink_core::models::resource::{
    CreateResource, Resource, ResourceFilter, ResourceKind, ResourceStatus,
};
use bloodlink_core::repository::{PaginatedResult, ResourceRepository};
use bloodlink_core::workflow;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::pagination;
use crate::api::extractors::{ApiPath, ApiQuery, ValidatedJson};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;

pub async fn create_resource(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(input): ValidatedJson<CreateResource>,
) -> ApiResult<ApiResponse<Resource>> {
    let actor = user.require(&[Role::Hospital, Role::Ngo, Role::Donor])?;
    let resource = workflow::create_resource(&state.resources, actor, input).await?;
    Ok(ApiResponse::created(resource, "Resource created successfully"))
}

#[derive(Debug, Deserialize)]
pub struct ResourceQuery {
    pub kind: Option<ResourceKind>,
    pub status: Option<ResourceStatus>,
    pub owner_id: Option<Uuid>,
    pub owner_type: Option<EntityType>,
    #[serde(default)]
    pub verified: bool,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl ResourceQuery {
    fn filter(&self) -> ApiResult<ResourceFilter> {
        let owner = match (self.owner_id, self.owner_type) {
            (Some(id), Some(entity_type)) => Some(EntityRef::new(id, entity_type)),
            (None, None) => None,
            _ => {
                return Err(ApiError::BadRequest(
                    "owner_id and owner_type must be given together".into(),
                ));
            }
        };
        Ok(ResourceFilter {
            kind: self.kind,
            status: self.status,
            owner,
            verified_only: self.verified,
        })
    }
}

pub async fn list_resources(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<ResourceQuery>,
) -> ApiResult<ApiResponse<PaginatedResult<Resource>>> {
    let resources = state
        .resources
        .list(query.filter()?, pagination(query.offset, query.limit))
        .await?;
    Ok(ApiResponse::ok(resources, "Resources fetched"))
}

pub async fn get_resource(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Resource>> {
    let resource = state.resources.get_by_id(id).await?;
    Ok(ApiResponse::ok(resource, "Resource fetched"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResourceStatusBody {
    pub status: ResourceStatus,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

pub async fn change_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(body): ValidatedJson<ResourceStatusBody>,
) -> ApiResult<ApiResponse<Resource>> {
    let resource = workflow::change_resource_status(
        &state.resources,
        &state.audit,
        user.0,
        id,
        body.status,
        body.reason,
    )
    .await?;
    Ok(ApiResponse::ok(resource, "Resource status updated"))
}

pub async fn verify(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Resource>> {
    let actor = user.require(&[Role::Admin])?;
    let resource = workflow::verify_resource(&state.resources, &state.audit, actor, id).await?;
    Ok(ApiResponse::ok(resource, "Resource verified"))
}

pub async fn pending_requests(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Vec<Request>>> {
    let pending =
        workflow::pending_requests_for(&state.requests, &state.resources, user.0, id).await?;
    Ok(ApiResponse::ok(pending, "Pending requests fetched"))
}
