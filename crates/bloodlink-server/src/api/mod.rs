//! API layer - routes, handlers, and middleware

pub mod extractors;
pub mod handlers;
pub mod middleware;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
};
use bloodlink_core::error::CoreError;
use serde_json::json;

use crate::state::AppState;
use handlers::{accounts, admin, appointments, centers, donations, requests, resources};

/// Routes mounted under `/api/v1`.
fn api_routes() -> Router<AppState> {
    Router::new()
        // Users
        .route("/users/register", post(accounts::register_user))
        .route("/users/login", post(accounts::login_user))
        .route("/users/refresh-token", post(accounts::refresh_token))
        .route("/users/logout", post(accounts::logout))
        .route("/users/profile/me", get(accounts::user_profile))
        .route("/users/dashboard", get(accounts::user_dashboard))
        // Hospitals
        .route("/hospitals/register", post(accounts::register_hospital))
        .route("/hospitals/login", post(accounts::login_hospital))
        .route("/hospitals/profile/me", get(accounts::hospital_profile))
        .route("/hospitals/dashboard", get(accounts::hospital_dashboard))
        // NGOs
        .route("/ngos/register", post(accounts::register_ngo))
        .route("/ngos/login", post(accounts::login_ngo))
        .route("/ngos/profile/me", get(accounts::ngo_profile))
        .route("/ngos/analytics", get(accounts::ngo_analytics))
        // Administration
        .route("/admin/hospitals/:id/verify", patch(admin::verify_hospital))
        .route("/admin/ngos/:id/verify", patch(admin::verify_ngo))
        .route("/admin/audit", get(admin::list_audit))
        // Resources
        .route(
            "/resources",
            post(resources::create_resource).get(resources::list_resources),
        )
        .route("/resources/:id", get(resources::get_resource))
        .route("/resources/:id/status", patch(resources::change_status))
        .route("/resources/:id/verify", patch(resources::verify))
        .route(
            "/resources/:id/requests/pending",
            get(resources::pending_requests),
        )
        // Requests
        .route("/requests", post(requests::create_request))
        .route("/requests/mine", get(requests::my_requests))
        .route("/requests/incoming", get(requests::incoming_requests))
        .route("/requests/:id", get(requests::get_request))
        .route("/requests/:id/status", patch(requests::change_status))
        .route(
            "/requests/:id/communications",
            post(requests::post_communication),
        )
        // Centers
        .route(
            "/centers",
            post(centers::create_center).get(centers::list_centers),
        )
        .route("/centers/nearby", get(centers::nearby_centers))
        .route("/centers/:id", get(centers::get_center))
        .route("/centers/:id/inventory", patch(centers::adjust_inventory))
        // Appointments and donations
        .route("/appointments", post(appointments::book))
        .route("/appointments/mine", get(appointments::my_appointments))
        .route("/appointments/:id/status", patch(appointments::change_status))
        .route("/donations", post(donations::record))
        .route("/donations/mine", get(donations::my_donations))
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_request_body_size;
    let cors_origins = state.config.server.cors_origins.clone();

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .fallback(not_found)
        .with_state(state)
        // Applied in reverse order
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(middleware::cors(&cors_origins))
        .layer(DefaultBodyLimit::max(max_body_size))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "bloodlink"
    }))
}

async fn not_found() -> crate::error::ApiError {
    crate::error::ApiError::Core(CoreError::not_found("route", "unknown"))
}
