//! JWT access token handling
//!
//! Signature, issuer and audience are checked by `jsonwebtoken` with exactly
//! one pinned HMAC algorithm. Claim presence and the `iat <= now < exp`
//! window are checked here so that the error kinds stay distinct.

use std::collections::BTreeSet;
use std::fmt;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Deserializer, Serialize};

use super::credentials::TenantCredentials;
use super::error::AuthError;

/// Token claims as they appear on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    pub aud: String,
    /// End-user id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub scopes: BTreeSet<String>,
    #[serde(rename = "qc_credentials")]
    pub credentials: TenantCredentials,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

/// Decoded payload before presence checks
#[derive(Deserialize)]
struct RawClaims {
    iss: Option<String>,
    aud: Option<serde_json::Value>,
    sub: Option<String>,
    #[serde(default, deserialize_with = "numeric_date")]
    iat: Option<i64>,
    #[serde(default, deserialize_with = "numeric_date")]
    exp: Option<i64>,
    scopes: Option<BTreeSet<String>>,
    qc_credentials: Option<TenantCredentials>,
    organization_id: Option<String>,
}

/// NumericDate per RFC 7519; fractional seconds are truncated
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.map(|secs| secs.trunc() as i64))
}

/// Parse an HMAC algorithm name (`HS256`, `HS384`, `HS512`)
pub fn parse_algorithm(name: &str) -> Option<Algorithm> {
    match name.to_ascii_uppercase().as_str() {
        "HS256" => Some(Algorithm::HS256),
        "HS384" => Some(Algorithm::HS384),
        "HS512" => Some(Algorithm::HS512),
        _ => None,
    }
}

/// Everything needed to sign and verify tokens
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: Vec<u8>,
    pub algorithm: Algorithm,
    pub issuer: String,
    pub audience: String,
    /// Clock skew tolerance applied to both `iat` and `exp`
    pub leeway_secs: u64,
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

/// Signs and verifies access tokens
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    issuer: String,
    audience: String,
    leeway: i64,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.header.alg)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(settings: &TokenSettings) -> Result<Self, AuthError> {
        if !matches!(
            settings.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::Internal(format!(
                "unsupported signing algorithm {:?}",
                settings.algorithm
            )));
        }
        if settings.secret.is_empty() {
            return Err(AuthError::Internal("empty signing secret".to_string()));
        }

        let mut validation = Validation::new(settings.algorithm);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        // Time and presence checks happen after signature verification below
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&settings.secret),
            decoding_key: DecodingKey::from_secret(&settings.secret),
            header: Header::new(settings.algorithm),
            validation,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            leeway: i64::try_from(settings.leeway_secs).unwrap_or(i64::MAX),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Sign a claim set. Deterministic for identical claims.
    pub fn encode(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        if claims.sub.trim().is_empty() {
            return Err(AuthError::Encoding("subject is empty".to_string()));
        }
        if claims.credentials.user_id().trim().is_empty() {
            return Err(AuthError::Encoding(
                "credential user_id is empty".to_string(),
            ));
        }
        if claims.credentials.api_token().trim().is_empty() {
            return Err(AuthError::Encoding(
                "credential api_token is empty".to_string(),
            ));
        }
        if claims.exp <= claims.iat {
            return Err(AuthError::Encoding(
                "expiry must be after issue time".to_string(),
            ));
        }

        encode(&self.header, claims, &self.encoding_key)
            .map_err(|e| AuthError::Encoding(e.to_string()))
    }

    /// Verify and decode a token against the current clock
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.decode_at(token, Utc::now().timestamp())
    }

    /// Verify and decode a token as of `now` (epoch seconds)
    pub fn decode_at(&self, token: &str, now: i64) -> Result<TokenClaims, AuthError> {
        let data = decode::<RawClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::MissingRequiredClaim(claim) if claim == "iss" => {
                    AuthError::InvalidToken("wrong issuer".to_string())
                }
                ErrorKind::MissingRequiredClaim(claim) if claim == "aud" => {
                    AuthError::InvalidToken("wrong audience".to_string())
                }
                ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
                ErrorKind::InvalidSignature => {
                    AuthError::InvalidToken("signature mismatch".to_string())
                }
                ErrorKind::InvalidIssuer => AuthError::InvalidToken("wrong issuer".to_string()),
                ErrorKind::InvalidAudience => {
                    AuthError::InvalidToken("wrong audience".to_string())
                }
                _ => AuthError::InvalidToken(e.to_string()),
            },
        )?;
        let raw = data.claims;

        let sub = raw
            .sub
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AuthError::MissingClaim("sub".to_string()))?;
        let iat = raw
            .iat
            .ok_or_else(|| AuthError::MissingClaim("iat".to_string()))?;
        let exp = raw
            .exp
            .ok_or_else(|| AuthError::MissingClaim("exp".to_string()))?;

        let credentials = raw
            .qc_credentials
            .ok_or_else(|| AuthError::MissingClaim("qc_credentials".to_string()))?;

        let iss = raw
            .iss
            .ok_or_else(|| AuthError::InvalidToken("wrong issuer".to_string()))?;
        // jsonwebtoken already matched the audience; a list collapses to ours
        let aud = match raw.aud {
            Some(serde_json::Value::String(aud)) => aud,
            Some(serde_json::Value::Array(_)) => self.audience.clone(),
            _ => return Err(AuthError::InvalidToken("wrong audience".to_string())),
        };

        // Only a structurally complete token can be reported as expired
        if exp <= now.saturating_sub(self.leeway) {
            return Err(AuthError::TokenExpired);
        }
        if iat > now.saturating_add(self.leeway) {
            return Err(AuthError::InvalidToken(
                "token issued in the future".to_string(),
            ));
        }

        Ok(TokenClaims {
            iss,
            aud,
            sub,
            iat,
            exp,
            scopes: raw.scopes.unwrap_or_default(),
            credentials,
            organization_id: raw.organization_id.filter(|org| !org.is_empty()),
        })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` value.
///
/// The scheme word is matched case-insensitively; the value must be exactly
/// two space-separated parts.
pub fn extract_bearer_token(header: &str) -> Result<&str, AuthError> {
    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Ok(token)
        }
        _ => Err(AuthError::MalformedHeader),
    }
}
