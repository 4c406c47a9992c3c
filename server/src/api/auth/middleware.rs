//! Authentication middleware

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::context::Identity;
use super::error::AuthError;
use super::gate::AuthGate;
use crate::api::types::ApiError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// Raw `Authorization` value. A header that is not visible ASCII is malformed.
pub fn authorization_header(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    match headers.get(header::AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| AuthError::MalformedHeader),
        None => Ok(None),
    }
}

/// Caller resolved by [`require_auth`]; `None` when auth is disabled
#[derive(Debug, Clone)]
pub struct Caller(pub Option<Arc<Identity>>);

/// Authentication middleware
///
/// Validates the bearer token and injects [`Caller`] into request extensions.
/// Authorization is per operation and happens in the handler.
pub async fn require_auth(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = if gate.is_enabled() {
        let header = authorization_header(request.headers())?;
        gate.authenticate(header)?
    } else {
        None
    };
    request
        .extensions_mut()
        .insert(Caller(identity.map(Arc::new)));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_authorization_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(authorization_header(&headers), Ok(None));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer x"));
        assert_eq!(authorization_header(&headers), Ok(Some("Bearer x")));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff").unwrap(),
        );
        assert_eq!(
            authorization_header(&headers),
            Err(AuthError::MalformedHeader)
        );
    }
}
