//! Donor appointments at donation centers.

use axum::extract::State;
use bloodlink_core::models::appointment::{
    AppointmentStatus, CreateAppointment, DonationAppointment,
};
use bloodlink_core::models::common::Role;
use bloodlink_core::repository::{AppointmentRepository, PaginatedResult};
use bloodlink_core::scheduling;
use serde::Deserialize;
use uuid::Uuid;

use super::PageQuery;
use crate::api::extractors::{ApiJson, ApiPath, ApiQuery, ValidatedJson};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::state::AppState;

pub async fn book(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(input): ValidatedJson<CreateAppointment>,
) -> ApiResult<ApiResponse<DonationAppointment>> {
    let actor = user.require(&[Role::Donor])?;
    let appointment =
        scheduling::book_appointment(&state.appointments, &state.centers, actor, input).await?;
    Ok(ApiResponse::created(appointment, "Appointment booked"))
}

pub async fn my_appointments(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<PaginatedResult<DonationAppointment>>> {
    let actor = user.require(&[Role::Donor])?;
    let appointments = state
        .appointments
        .list_by_donor(actor.id, page.pagination())
        .await?;
    Ok(ApiResponse::ok(appointments, "Appointments fetched"))
}

#[derive(Debug, Deserialize)]
pub struct AppointmentStatusBody {
    pub status: AppointmentStatus,
}

pub async fn change_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AppointmentStatusBody>,
) -> ApiResult<ApiResponse<DonationAppointment>> {
    let appointment = scheduling::change_appointment_status(
        &state.appointments,
        &state.centers,
        user.0,
        id,
        body.status,
    )
    .await?;
    Ok(ApiResponse::ok(appointment, "Appointment updated"))
}
