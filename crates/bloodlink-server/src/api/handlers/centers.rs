//! Donation centers and their blood inventory.

use axum::extract::State;
use bloodlink_core::models::center::{Center, CreateCenter, InventoryChange};
use bloodlink_core::models::common::{GeoPoint, Role};
use bloodlink_core::repository::{CenterRepository, PaginatedResult};
use bloodlink_core::scheduling::{self, NearbyCenter};
use serde::Deserialize;
use uuid::Uuid;

use super::PageQuery;
use crate::api::extractors::{ApiJson, ApiPath, ApiQuery, ValidatedJson};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;

const DEFAULT_RADIUS_KM: f64 = 25.0;

pub async fn create_center(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(input): ValidatedJson<CreateCenter>,
) -> ApiResult<ApiResponse<Center>> {
    let actor = user.require(&[Role::Hospital, Role::Ngo])?;
    let center = scheduling::create_center(&state.centers, actor, input).await?;
    Ok(ApiResponse::created(center, "Center created successfully"))
}

pub async fn list_centers(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<PaginatedResult<Center>>> {
    let centers = state.centers.list(page.pagination()).await?;
    Ok(ApiResponse::ok(centers, "Centers fetched"))
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub longitude: f64,
    pub latitude: f64,
    pub radius_km: Option<f64>,
}

pub async fn nearby_centers(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<NearbyQuery>,
) -> ApiResult<ApiResponse<Vec<NearbyCenter>>> {
    if !(query.longitude.is_finite() && query.latitude.is_finite()) {
        return Err(ApiError::BadRequest("coordinates must be finite numbers".into()));
    }
    let centers = scheduling::find_nearby_centers(
        &state.centers,
        GeoPoint::new(query.longitude, query.latitude),
        query.radius_km.unwrap_or(DEFAULT_RADIUS_KM),
    )
    .await?;
    Ok(ApiResponse::ok(centers, "Nearby centers fetched"))
}

pub async fn get_center(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Center>> {
    let center = state.centers.get_by_id(id).await?;
    Ok(ApiResponse::ok(center, "Center fetched"))
}

pub async fn adjust_inventory(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(change): ApiJson<InventoryChange>,
) -> ApiResult<ApiResponse<Center>> {
    let center =
        scheduling::adjust_inventory(&state.centers, &state.audit, user.0, id, change).await?;
    Ok(ApiResponse::ok(center, "Inventory updated"))
}
