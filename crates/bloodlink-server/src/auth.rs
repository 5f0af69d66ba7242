//! Request authentication.
//!
//! The access token is read from `Authorization: Bearer <jwt>` or, failing
//! that, the `accessToken` cookie. Handlers take [`AuthUser`] to require a
//! caller and then check the role allow-list with [`AuthUser::require`].

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, header, request::Parts},
};
use bloodlink_auth::AuthConfig;
use bloodlink_auth::token;
use bloodlink_core::models::common::{Actor, Role};

use crate::error::ApiError;
use crate::state::AppState;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// The authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Actor);

impl AuthUser {
    /// Reject the call unless the caller holds one of `roles`.
    pub fn require(&self, roles: &[Role]) -> Result<Actor, ApiError> {
        if roles.contains(&self.0.role) {
            Ok(self.0)
        } else {
            Err(ApiError::Forbidden(format!(
                "role {} is not allowed to access this resource",
                self.0.role
            )))
        }
    }
}

/// Value of the named cookie, if the request carries it.
pub fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(authz) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let authz = authz
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Authorization header is not valid UTF-8".into()))?;
    authz
        .strip_prefix("Bearer ")
        .or_else(|| authz.strip_prefix("bearer "))
        .map(|t| Some(t.trim().to_string()))
        .ok_or_else(|| ApiError::Unauthorized("Authorization header must be 'Bearer <token>'".into()))
}

/// Resolve the caller from request headers. `Ok(None)` when no token is
/// present at all.
pub fn authenticate_headers(
    headers: &HeaderMap,
    config: &AuthConfig,
) -> Result<Option<Actor>, ApiError> {
    let token = match bearer_token(headers)? {
        Some(token) => token,
        None => match cookie(headers, ACCESS_COOKIE) {
            Some(token) => token,
            None => return Ok(None),
        },
    };
    let claims = token::decode_access_token(&token, config)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;
    let actor = claims
        .actor()
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;
    Ok(Some(actor))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate_headers(&parts.headers, &state.config.auth)?
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("authentication required".into()))
    }
}

/// Like [`AuthUser`] but lets anonymous callers through. A token that is
/// present but invalid is still rejected.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<Actor>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate_headers(&parts.headers, &state.config.auth).map(MaybeAuthUser)
    }
}

/// `Set-Cookie` value for an HttpOnly token cookie.
pub fn token_cookie(name: &str, value: &str, max_age_secs: u64, secure: bool) -> Option<HeaderValue> {
    let mut cookie = format!("{name}={value}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

/// `Set-Cookie` value that clears a token cookie.
pub fn clear_cookie(name: &str) -> HeaderValue {
    // Cookie names are ASCII constants, so this never falls back.
    HeaderValue::from_str(&format!("{name}=; HttpOnly; Path=/; Max-Age=0"))
        .unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; accessToken=abc.def; other=1"),
        );
        assert_eq!(cookie(&headers, ACCESS_COOKIE).as_deref(), Some("abc.def"));
        assert_eq!(cookie(&headers, REFRESH_COOKIE), None);
    }

    #[test]
    fn malformed_authorization_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert!(bearer_token(&headers).is_err());
    }

    #[test]
    fn no_credentials_means_anonymous() {
        let headers = HeaderMap::new();
        let config = AuthConfig::default();
        assert!(authenticate_headers(&headers, &config).unwrap().is_none());
    }

    #[test]
    fn role_allow_list() {
        let user = AuthUser(Actor::new(uuid::Uuid::new_v4(), Role::Donor));
        assert!(user.require(&[Role::Donor, Role::Admin]).is_ok());
        assert!(matches!(
            user.require(&[Role::Hospital]),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn token_cookie_is_http_only() {
        let value = token_cookie(ACCESS_COOKIE, "t", 900, true).unwrap();
        let text = value.to_str().unwrap();
        assert!(text.starts_with("accessToken=t;"));
        assert!(text.contains("HttpOnly"));
        assert!(text.contains("Secure"));
    }
}
