//! Authentication manager
//!
//! Turns an `Authorization` header into a validated [`Identity`]. It never
//! binds the request context; that happens after authorization succeeds.

use std::collections::BTreeSet;

use chrono::{Duration, Utc};

use super::context::Identity;
use super::credentials::TenantCredentials;
use super::error::AuthError;
use super::jwt::{TokenClaims, TokenCodec, TokenSettings, extract_bearer_token};

/// Validates bearer tokens and issues internal ones
#[derive(Debug, Clone)]
pub struct Authenticator {
    codec: TokenCodec,
    default_ttl: Duration,
}

impl Authenticator {
    pub fn new(settings: &TokenSettings, default_ttl: Duration) -> Result<Self, AuthError> {
        Ok(Self {
            codec: TokenCodec::new(settings)?,
            default_ttl,
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Validate a raw header value (`None` when the header is absent)
    pub fn validate(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        let header = header.ok_or(AuthError::MissingHeader)?;
        let token = extract_bearer_token(header)?;
        self.validate_token(token)
    }

    /// Validate a bare token
    pub fn validate_token(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.codec.decode(token)?;
        let identity = Identity::from_claims(claims)?;
        tracing::debug!(
            user_id = %identity.user_id(),
            scopes = identity.scopes().len(),
            "Token validated"
        );
        Ok(identity)
    }

    /// Issue a token for internal use and testing.
    ///
    /// There is no revocation or refresh; tokens live until `exp`.
    pub fn create_token(
        &self,
        subject: &str,
        scopes: BTreeSet<String>,
        credentials: TenantCredentials,
        ttl: Option<Duration>,
        organization_id: Option<String>,
    ) -> Result<String, AuthError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl <= Duration::zero() {
            return Err(AuthError::Encoding("ttl must be positive".to_string()));
        }
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            iss: self.codec.issuer().to_string(),
            aud: self.codec.audience().to_string(),
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(ttl.num_seconds()),
            scopes,
            credentials,
            organization_id: organization_id.filter(|org| !org.is_empty()),
        };
        let token = self.codec.encode(&claims)?;
        tracing::debug!(subject, expires_at = claims.exp, "Issued token");
        Ok(token)
    }
}
