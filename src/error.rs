//! Error type shared by the services and the HTTP layer.
//!
//! Every failure a handler can produce is an [`AppError`]. The `IntoResponse`
//! impl maps each kind to a status code and a JSON body of the form
//! `{"status": "error", "error": <kind>, "message": <text>}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("username already exists")]
    UserAlreadyExists,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("tweet not found: {0}")]
    TweetNotFound(String),
    #[error("authentication required: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable kind name used in the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::UserAlreadyExists => "UserAlreadyExists",
            AppError::InvalidCredentials => "InvalidCredentials",
            AppError::UserNotFound(_) => "UserNotFound",
            AppError::TweetNotFound(_) => "TweetNotFound",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Validation(_) => "Validation",
            AppError::Storage(_) => "Storage",
            AppError::Internal(_) => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UserAlreadyExists => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::UserNotFound(_) | AppError::TweetNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Server-side failures keep their detail in the log only
        let message = match &self {
            AppError::Storage(_) | AppError::Internal(_) => {
                error!("{} ({})", self, status);
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };
        (
            status,
            Json(json!({"status": "error", "error": self.kind(), "message": message})),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::UserAlreadyExists.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::UserNotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Forbidden("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_storage_error_hides_detail() {
        let response = AppError::Storage("connection refused at 10.0.0.3".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json_response: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json_response["status"], "error");
        assert_eq!(json_response["error"], "Storage");
        assert!(!json_response["message"]
            .as_str()
            .unwrap()
            .contains("10.0.0.3"));
    }
}
