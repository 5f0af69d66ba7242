//! Field-level validation rules shared by the `Create*` inputs.
//!
//! The `validate_*` functions have the signature `validator` expects for
//! `#[validate(custom(function = ...))]`; the `check_*` functions return
//! [`CoreResult`] for use inside lifecycle code.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use validator::ValidationError;

use crate::error::{CoreError, CoreResult};
use crate::models::common::GeoPoint;

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{10}$").unwrap());
static PIN_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{6}$").unwrap());

pub const PURPOSE_MIN_LEN: usize = 10;
pub const PURPOSE_MAX_LEN: usize = 500;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_RE.is_match(phone) {
        Ok(())
    } else {
        Err(error("phone", "phone number must be exactly 10 digits"))
    }
}

pub fn validate_pin_code(pin: &str) -> Result<(), ValidationError> {
    if PIN_CODE_RE.is_match(pin) {
        Ok(())
    } else {
        Err(error("pin_code", "PIN code must be exactly 6 digits"))
    }
}

pub fn validate_point(point: &GeoPoint) -> Result<(), ValidationError> {
    if !(-180.0..=180.0).contains(&point.longitude) {
        return Err(error(
            "longitude",
            "longitude must be between -180 and 180",
        ));
    }
    if !(-90.0..=90.0).contains(&point.latitude) {
        return Err(error("latitude", "latitude must be between -90 and 90"));
    }
    Ok(())
}

/// A request's validity window must be non-empty: `start < end`.
pub fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<()> {
    if end <= start {
        return Err(CoreError::validation(
            "duration: end_date must be after start_date",
        ));
    }
    Ok(())
}

pub fn check_password_length(password: &str, min: usize) -> CoreResult<()> {
    if password.chars().count() < min {
        return Err(CoreError::validation(format!(
            "password: must be at least {min} characters"
        )));
    }
    Ok(())
}
