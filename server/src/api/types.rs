//! Shared API types
//!
//! Common error shape used by every endpoint.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::auth::AuthError;

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Unauthorized { code: String, message: String },
    Forbidden { code: String, message: String },
    ServiceUnavailable { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        let code = e.code().to_string();
        match e.status() {
            StatusCode::UNAUTHORIZED => Self::Unauthorized {
                code,
                message: e.to_string(),
            },
            StatusCode::FORBIDDEN => Self::Forbidden {
                code,
                message: e.to_string(),
            },
            StatusCode::BAD_REQUEST => Self::BadRequest {
                code,
                message: e.to_string(),
            },
            StatusCode::SERVICE_UNAVAILABLE => Self::ServiceUnavailable {
                code,
                message: e.to_string(),
            },
            _ => {
                tracing::error!(error = %e, code = %code, "Auth core malfunction");
                Self::Internal {
                    message: "Internal authentication error".to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, code, message) = match self {
            Self::BadRequest { code, message } => ("bad_request", code, message),
            Self::NotFound { code, message } => ("not_found", code, message),
            Self::Unauthorized { code, message } => ("unauthorized", code, message),
            Self::Forbidden { code, message } => ("forbidden", code, message),
            Self::ServiceUnavailable { code, message } => ("service_unavailable", code, message),
            Self::Internal { message } => ("internal_error", "INTERNAL".to_string(), message),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}
