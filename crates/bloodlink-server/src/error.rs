//! HTTP error type and its JSON envelope.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bloodlink_core::error::CoreError;
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => match err {
                CoreError::Validation { .. } => StatusCode::BAD_REQUEST,
                CoreError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
                CoreError::AuthorizationDenied { .. } => StatusCode::FORBIDDEN,
                CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                CoreError::AlreadyExists { .. }
                | CoreError::InvalidTransition { .. }
                | CoreError::Conflict { .. }
                | CoreError::VersionConflict { .. } => StatusCode::CONFLICT,
                CoreError::Database(_) | CoreError::Crypto(_) | CoreError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Field-level messages for validation failures.
    fn details(&self) -> Vec<String> {
        match self {
            ApiError::Core(CoreError::Validation { message }) => {
                message.split("; ").map(str::to_string).collect()
            }
            ApiError::BadRequest(message) => vec![message.clone()],
            _ => Vec::new(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Internal error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "statusCode": status.as_u16(),
            "data": null,
            "message": message,
            "success": false,
            "errors": self.details(),
        }));

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

impl From<bloodlink_auth::AuthError> for ApiError {
    fn from(err: bloodlink_auth::AuthError) -> Self {
        ApiError::Core(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_errors_list_each_field() {
        let err = ApiError::Core(CoreError::validation("email: invalid; phone: too short"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["success"], false);
        assert!(body["data"].is_null());
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = ApiError::Core(CoreError::Database("socket closed".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn conflicts_map_to_409() {
        let stale = ApiError::Core(CoreError::VersionConflict {
            entity: "request".into(),
            id: "x".into(),
        });
        let illegal = ApiError::Core(CoreError::InvalidTransition {
            entity: "request".into(),
            from: "COMPLETED".into(),
            to: "PENDING".into(),
        });
        assert_eq!(stale.status(), StatusCode::CONFLICT);
        assert_eq!(illegal.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unauthorized_carries_challenge_header() {
        let response = ApiError::Unauthorized("missing token".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
