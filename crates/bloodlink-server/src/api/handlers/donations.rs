//! Recorded blood donations.

use axum::extract::State;
use bloodlink_core::models::common::Role;
use bloodlink_core::models::donation::{BloodDonation, CreateDonation};
use bloodlink_core::repository::{DonationRepository, PaginatedResult};
use bloodlink_core::scheduling;

use super::PageQuery;
use crate::api::extractors::{ApiQuery, ValidatedJson};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::state::AppState;

pub async fn record(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(input): ValidatedJson<CreateDonation>,
) -> ApiResult<ApiResponse<BloodDonation>> {
    let actor = user.require(&[Role::Hospital, Role::Ngo, Role::Admin])?;
    let donation = scheduling::record_donation(
        &state.donations,
        &state.centers,
        &state.appointments,
        &state.users,
        &state.audit,
        actor,
        input,
    )
    .await?;
    Ok(ApiResponse::created(donation, "Donation recorded"))
}

pub async fn my_donations(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<PaginatedResult<BloodDonation>>> {
    let actor = user.require(&[Role::Donor])?;
    let donations = state
        .donations
        .list_by_donor(actor.id, page.pagination())
        .await?;
    Ok(ApiResponse::ok(donations, "Donations fetched"))
}
