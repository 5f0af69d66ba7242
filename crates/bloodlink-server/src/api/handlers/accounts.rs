//! Registration, login, token refresh, logout, profiles and dashboards
//! for donors, hospitals and NGOs.

use axum::{
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
    Json,
};
use bloodlink_auth::service::{LoginInput, LoginOutput, RefreshInput};
use bloodlink_core::dashboard::{self, DonorSummary, OwnerSummary};
use bloodlink_core::error::CoreError;
use bloodlink_core::models::common::{EntityType, Role};
use bloodlink_core::models::hospital::{CreateHospital, Hospital};
use bloodlink_core::models::ngo::{CreateNgo, Ngo};
use bloodlink_core::models::user::{CreateUser, User};
use bloodlink_core::repository::{HospitalRepository, NgoRepository, UserRepository};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::auth::{
    ACCESS_COOKIE, AuthUser, MaybeAuthUser, REFRESH_COOKIE, clear_cookie, cookie, token_cookie,
};
use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginBody {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshBody {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub account: serde_json::Value,
    pub role: Role,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

async fn account_profile(state: &AppState, role: Role, id: Uuid) -> ApiResult<serde_json::Value> {
    let value = match role.entity_type() {
        EntityType::User => serde_json::to_value(state.users.get_by_id(id).await?),
        EntityType::Hospital => serde_json::to_value(state.hospitals.get_by_id(id).await?),
        EntityType::Ngo => serde_json::to_value(state.ngos.get_by_id(id).await?),
    };
    value.map_err(|e| CoreError::Internal(format!("profile encode: {e}")).into())
}

/// Envelope the token pair and set both HttpOnly cookies.
async fn token_response(state: &AppState, output: LoginOutput, message: &str) -> ApiResult<Response> {
    let auth = &state.config.auth;
    let access = token_cookie(
        ACCESS_COOKIE,
        &output.access_token,
        auth.access_token_lifetime_secs,
        auth.cookie_secure,
    );
    let refresh = token_cookie(
        REFRESH_COOKIE,
        &output.refresh_token,
        auth.refresh_token_lifetime_secs,
        auth.cookie_secure,
    );

    let data = TokenData {
        account: account_profile(state, output.role, output.account_id).await?,
        role: output.role,
        access_token: output.access_token,
        refresh_token: output.refresh_token,
        expires_in: output.expires_in,
    };
    let mut response = ApiResponse::ok(data, message).into_response();
    for value in [access, refresh].into_iter().flatten() {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}

async fn login(
    state: &AppState,
    kind: EntityType,
    headers: &HeaderMap,
    body: LoginBody,
) -> ApiResult<Response> {
    let output = state
        .auth
        .login(
            kind,
            LoginInput {
                email: body.email,
                password: body.password,
                ip_address: client_ip(headers),
                user_agent: user_agent(headers),
            },
        )
        .await?;
    token_response(state, output, "Logged in successfully").await
}

// ---------------------------------------------------------------------------
// Users (donors and administrators)
// ---------------------------------------------------------------------------

pub async fn register_user(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> ApiResult<ApiResponse<User>> {
    let user = state.auth.register_user(input, caller.as_ref()).await?;
    Ok(ApiResponse::created(user, "User registered successfully"))
}

pub async fn login_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<LoginBody>,
) -> ApiResult<Response> {
    login(&state, EntityType::User, &headers, body).await
}

/// Rotate the refresh token taken from the `refreshToken` cookie or the
/// JSON body.
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshBody>>,
) -> ApiResult<Response> {
    let raw = cookie(&headers, REFRESH_COOKIE)
        .or_else(|| body.and_then(|Json(b)| b.refresh_token))
        .ok_or_else(|| crate::error::ApiError::Unauthorized("refresh token required".into()))?;

    let output = state
        .auth
        .refresh(RefreshInput {
            raw_refresh_token: raw,
            ip_address: client_ip(&headers),
            user_agent: user_agent(&headers),
        })
        .await?;
    token_response(&state, output, "Access token refreshed").await
}

/// End the session behind the refresh cookie, or every session of the
/// caller when no cookie is sent.
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
) -> ApiResult<Response> {
    match cookie(&headers, REFRESH_COOKIE) {
        Some(raw) => state.auth.logout(&raw).await?,
        None => state.auth.revoke_all_sessions(&user.0).await?,
    }

    let mut response = ApiResponse::ok((), "Logged out successfully").into_response();
    for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
        response
            .headers_mut()
            .append(header::SET_COOKIE, clear_cookie(name));
    }
    Ok(response)
}

pub async fn user_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<User>> {
    let actor = user.require(&[Role::Donor, Role::Admin])?;
    let profile = state.users.get_by_id(actor.id).await?;
    Ok(ApiResponse::ok(profile, "User profile fetched"))
}

pub async fn user_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<DonorSummary>> {
    let actor = user.require(&[Role::Donor, Role::Admin])?;
    let summary =
        dashboard::donor_summary(&state.users, &state.appointments, &state.donations, actor.id)
            .await?;
    Ok(ApiResponse::ok(summary, "Dashboard fetched"))
}

// ---------------------------------------------------------------------------
// Hospitals
// ---------------------------------------------------------------------------

pub async fn register_hospital(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateHospital>,
) -> ApiResult<ApiResponse<Hospital>> {
    let hospital = state.auth.register_hospital(input).await?;
    Ok(ApiResponse::created(hospital, "Hospital registered successfully"))
}

pub async fn login_hospital(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<LoginBody>,
) -> ApiResult<Response> {
    login(&state, EntityType::Hospital, &headers, body).await
}

pub async fn hospital_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<Hospital>> {
    let actor = user.require(&[Role::Hospital])?;
    let profile = state.hospitals.get_by_id(actor.id).await?;
    Ok(ApiResponse::ok(profile, "Hospital profile fetched"))
}

async fn owner_summary(state: &AppState, user: AuthUser, role: Role) -> ApiResult<OwnerSummary> {
    let actor = user.require(&[role])?;
    Ok(dashboard::owner_summary(
        &state.resources,
        &state.requests,
        &state.centers,
        actor.entity_ref(),
    )
    .await?)
}

pub async fn hospital_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<OwnerSummary>> {
    let summary = owner_summary(&state, user, Role::Hospital).await?;
    Ok(ApiResponse::ok(summary, "Dashboard fetched"))
}

// ---------------------------------------------------------------------------
// NGOs
// ---------------------------------------------------------------------------

pub async fn register_ngo(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateNgo>,
) -> ApiResult<ApiResponse<Ngo>> {
    let ngo = state.auth.register_ngo(input).await?;
    Ok(ApiResponse::created(ngo, "NGO registered successfully"))
}

pub async fn login_ngo(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<LoginBody>,
) -> ApiResult<Response> {
    login(&state, EntityType::Ngo, &headers, body).await
}

pub async fn ngo_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<Ngo>> {
    let actor = user.require(&[Role::Ngo])?;
    let profile = state.ngos.get_by_id(actor.id).await?;
    Ok(ApiResponse::ok(profile, "NGO profile fetched"))
}

pub async fn ngo_analytics(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<OwnerSummary>> {
    let summary = owner_summary(&state, user, Role::Ngo).await?;
    Ok(ApiResponse::ok(summary, "Analytics fetched"))
}
