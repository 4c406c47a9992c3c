//! Per-tenant downstream credentials
//!
//! Credentials travel inside the signed token (`qc_credentials` claim) or, in a
//! trusted development setup, come from configuration. They are never
//! persisted and never logged in full.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Deserializer, Serialize};

use super::error::AuthError;
use crate::utils::crypto;

/// Downstream platform credentials for one tenant
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantCredentials {
    #[serde(default, deserialize_with = "string_or_number")]
    user_id: String,
    #[serde(default)]
    api_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    organization_id: Option<String>,
}

impl fmt::Debug for TenantCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantCredentials")
            .field("user_id", &self.user_id)
            .field("api_token", &"[REDACTED]")
            .field("organization_id", &self.organization_id)
            .finish()
    }
}

impl TenantCredentials {
    pub fn new(
        user_id: impl Into<String>,
        api_token: impl Into<String>,
        organization_id: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            api_token: api_token.into(),
            organization_id: organization_id.filter(|org| !org.is_empty()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    /// Both mandatory fields present
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.user_id.trim().is_empty() {
            return Err(AuthError::InvalidCredential("missing user_id".to_string()));
        }
        if self.api_token.trim().is_empty() {
            return Err(AuthError::InvalidCredential(
                "missing api_token".to_string(),
            ));
        }
        Ok(())
    }

    /// Derive the platform's timestamped request authentication.
    ///
    /// `Basic base64("{user_id}:{sha256_hex("{api_token}:{timestamp}")}")`
    pub fn auth_headers(&self, timestamp: i64) -> DownstreamAuth {
        let hashed = crypto::sha256_hex(&format!("{}:{}", self.api_token, timestamp));
        let basic = BASE64.encode(format!("{}:{}", self.user_id, hashed));
        DownstreamAuth {
            authorization: format!("Basic {}", basic),
            timestamp: timestamp.to_string(),
            organization_id: self.organization_id.clone(),
        }
    }
}

/// Accepts `"406922"`, `406922` or `null`
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(String::new()),
        Some(serde_json::Value::String(s)) => Ok(s),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number for user_id, got {}",
            other
        ))),
    }
}

/// Headers to attach to a downstream platform request
#[derive(Clone)]
pub struct DownstreamAuth {
    pub authorization: String,
    pub timestamp: String,
    pub organization_id: Option<String>,
}

impl fmt::Debug for DownstreamAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownstreamAuth")
            .field("authorization", &"[REDACTED]")
            .field("timestamp", &self.timestamp)
            .field("organization_id", &self.organization_id)
            .finish()
    }
}

impl DownstreamAuth {
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Authorization", self.authorization.clone()),
            ("Timestamp", self.timestamp.clone()),
        ];
        if let Some(org) = &self.organization_id {
            headers.push(("Organization-Id", org.clone()));
        }
        headers
    }
}

/// Pick the credentials for the current call.
///
/// The bound identity always wins. `fallback` is consulted only when nothing
/// is bound, and its use is logged.
pub fn resolve_credentials(
    bound: Option<&TenantCredentials>,
    fallback: Option<&TenantCredentials>,
) -> Result<TenantCredentials, AuthError> {
    if let Some(credentials) = bound {
        return Ok(credentials.clone());
    }
    match fallback {
        Some(credentials) => {
            tracing::warn!(
                tenant_user_id = %credentials.user_id(),
                "Using fallback tenant credentials from configuration"
            );
            Ok(credentials.clone())
        }
        None => Err(AuthError::CredentialsUnavailable),
    }
}
