use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use auth::AuthError;
use authz::AuthzError;

use crate::media::MediaError;

/// API Error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Basic auth failed; the client should prompt for credentials.
    #[error("Unauthorized")]
    Unauthorized { realm: String },

    /// Session missing or invalid; the browser should log in again.
    #[error("Login required")]
    LoginRequired { location: String },

    #[error("{0}")]
    Forbidden(String),

    #[error("Cannot access this resource because its age exceeds the viewable limit")]
    ResourceTooOld,

    /// A signed media link was missing, tampered with, or expired.
    #[error("Access denied")]
    AccessDenied,

    #[error("Unknown resource")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Attached to responses for errors that should reach the error reporter.
#[derive(Debug, Clone)]
pub struct ReportableError(pub String);

impl ApiError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::LoginRequired { .. } => StatusCode::FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::ResourceTooOld => StatusCode::FORBIDDEN,
            ApiError::AccessDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for the error type
    pub fn error_code(&self) -> &str {
        match self {
            ApiError::Unauthorized { .. } => "UNAUTHORIZED",
            ApiError::LoginRequired { .. } => "LOGIN_REQUIRED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::ResourceTooOld => "RESOURCE_TOO_OLD",
            ApiError::AccessDenied => "ACCESS_DENIED",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to the client.
    fn public_message(&self) -> String {
        match self {
            ApiError::Upstream(_) => "The upstream media source could not be reached".to_string(),
            ApiError::InternalError(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }

    fn is_reportable(&self) -> bool {
        matches!(self, ApiError::Upstream(_) | ApiError::InternalError(_))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = ApiErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.public_message(),
            },
        };

        let mut response = (status, Json(error_response)).into_response();
        match &self {
            ApiError::Unauthorized { realm } => {
                let challenge = format!("Basic realm=\"{}\"", realm.replace('"', ""));
                if let Ok(value) = HeaderValue::from_str(&challenge) {
                    response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
                }
            }
            ApiError::LoginRequired { location } => {
                if let Ok(value) = HeaderValue::from_str(location) {
                    response.headers_mut().insert(header::LOCATION, value);
                }
            }
            _ => {}
        }
        if self.is_reportable() {
            response
                .extensions_mut()
                .insert(ReportableError(self.to_string()));
        }
        response
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::LookupNotFound(_) | AuthzError::PermissionDenied => {
                ApiError::Forbidden(AuthzError::PermissionDenied.to_string())
            }
            AuthzError::ResourceTooOld => ApiError::ResourceTooOld,
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            err if err.is_signature_failure() => ApiError::AccessDenied,
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::NotFound => ApiError::NotFound,
            MediaError::Upstream(message) => ApiError::Upstream(message),
        }
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
