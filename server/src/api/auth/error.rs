//! Authentication and authorization error taxonomy

use axum::http::StatusCode;
use thiserror::Error;

/// Every way the auth core can reject (or fail to serve) a call.
///
/// Authentication kinds map to 401, authorization to 403. `Internal` is a
/// malfunction and must never be reported as an access decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header required")]
    MissingHeader,

    #[error("Invalid Authorization header format. Expected 'Bearer <token>'")]
    MalformedHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token missing '{0}' claim")]
    MissingClaim(String),

    #[error("Invalid tenant credentials in token: {0}")]
    InvalidCredential(String),

    #[error("Token grants no scopes")]
    MissingScopes,

    /// Only the missing scopes are reported, never the caller's full grant.
    #[error("Insufficient permissions for {operation}. Missing scopes: {}", .missing.join(", "))]
    Authorization {
        operation: String,
        missing: Vec<String>,
    },

    #[error("Unknown scope bundle: {0}")]
    UnknownBundle(String),

    #[error("Cannot issue token: {0}")]
    Encoding(String),

    #[error(
        "No tenant credentials available. Authenticate with a token or configure fallback credentials"
    )]
    CredentialsUnavailable,

    #[error("Internal authentication error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingHeader => "AUTH_REQUIRED",
            Self::MalformedHeader => "MALFORMED_HEADER",
            Self::InvalidToken(_) => "TOKEN_INVALID",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::MissingClaim(_) => "MISSING_CLAIM",
            Self::InvalidCredential(_) => "INVALID_CREDENTIAL",
            Self::MissingScopes => "MISSING_SCOPES",
            Self::Authorization { .. } => "INSUFFICIENT_SCOPE",
            Self::UnknownBundle(_) => "UNKNOWN_BUNDLE",
            Self::Encoding(_) => "ENCODING_ERROR",
            Self::CredentialsUnavailable => "CREDENTIALS_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingHeader
            | Self::MalformedHeader
            | Self::InvalidToken(_)
            | Self::TokenExpired
            | Self::MissingClaim(_)
            | Self::InvalidCredential(_)
            | Self::MissingScopes => StatusCode::UNAUTHORIZED,
            Self::Authorization { .. } => StatusCode::FORBIDDEN,
            Self::UnknownBundle(_) => StatusCode::BAD_REQUEST,
            Self::CredentialsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Encoding(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures that prove nothing about who the caller is
    pub fn is_authentication(&self) -> bool {
        self.status() == StatusCode::UNAUTHORIZED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_message_lists_missing() {
        let err = AuthError::Authorization {
            operation: "update_project".to_string(),
            missing: vec!["qc:projects:write".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Insufficient permissions for update_project. Missing scopes: qc:projects:write"
        );
        assert_eq!(err.code(), "INSUFFICIENT_SCOPE");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_status_classes() {
        assert!(AuthError::MalformedHeader.is_authentication());
        assert!(AuthError::TokenExpired.is_authentication());
        assert!(AuthError::MissingScopes.is_authentication());
        assert!(!AuthError::UnknownBundle("x".into()).is_authentication());
        assert!(!AuthError::Internal("x".into()).is_authentication());
        assert_eq!(
            AuthError::CredentialsUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_expired_and_invalid_are_distinct() {
        assert_ne!(
            AuthError::TokenExpired.code(),
            AuthError::InvalidToken("bad".into()).code()
        );
    }
}
