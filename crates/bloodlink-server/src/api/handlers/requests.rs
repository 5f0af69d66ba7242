//! Resource requests: filing, listing, the approval workflow and the
//! message thread.

use axum::extract::State;
use bloodlink_core::models::common::Role;
use bloodlink_core::models::request::{CreateCommunication, CreateRequest, Request, StatusChange};
use bloodlink_core::repository::{PaginatedResult, RequestRepository};
use bloodlink_core::workflow;
use uuid::Uuid;

use super::PageQuery;
use crate::api::extractors::{ApiPath, ApiQuery, ValidatedJson};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::state::AppState;

pub async fn create_request(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(input): ValidatedJson<CreateRequest>,
) -> ApiResult<ApiResponse<Request>> {
    let actor = user.require(&[Role::Hospital, Role::Ngo])?;
    let request = workflow::submit_request(&state.requests, &state.resources, actor, input).await?;
    Ok(ApiResponse::created(request, "Request submitted successfully"))
}

pub async fn my_requests(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<PaginatedResult<Request>>> {
    let actor = user.require(&[Role::Hospital, Role::Ngo])?;
    let requests = state
        .requests
        .list_by_requester(actor.entity_ref(), page.pagination())
        .await?;
    Ok(ApiResponse::ok(requests, "Requests fetched"))
}

pub async fn incoming_requests(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<PaginatedResult<Request>>> {
    let actor = user.require(&[Role::Hospital, Role::Ngo])?;
    let requests = state
        .requests
        .list_incoming(actor.entity_ref(), page.pagination())
        .await?;
    Ok(ApiResponse::ok(requests, "Incoming requests fetched"))
}

pub async fn get_request(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Request>> {
    let request = workflow::get_request(&state.requests, &state.resources, user.0, id).await?;
    Ok(ApiResponse::ok(request, "Request fetched"))
}

pub async fn change_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(change): ValidatedJson<StatusChange>,
) -> ApiResult<ApiResponse<Request>> {
    let actor = user.require(&[Role::Hospital, Role::Ngo, Role::Admin])?;
    let request = workflow::change_request_status(
        &state.requests,
        &state.resources,
        &state.audit,
        actor,
        id,
        change,
        state.transition_policy(),
    )
    .await?;
    Ok(ApiResponse::ok(request, "Request status updated"))
}

pub async fn post_communication(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(input): ValidatedJson<CreateCommunication>,
) -> ApiResult<ApiResponse<Request>> {
    let request =
        workflow::post_communication(&state.requests, &state.resources, user.0, id, input).await?;
    Ok(ApiResponse::created(request, "Message posted"))
}
