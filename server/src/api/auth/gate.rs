//! Authenticate, authorize, bind
//!
//! [`AuthGate`] is the single interception stage wrapped around every tool
//! call. It is an ordinary value, so the HTTP layer and tests compose it the
//! same way.

use std::future::Future;
use std::sync::Arc;

use super::context::{self, Identity};
use super::credentials::{self, TenantCredentials};
use super::error::AuthError;
use super::guard;
use super::manager::Authenticator;
use super::scopes::Scope;

#[derive(Debug, Clone)]
pub struct AuthGate {
    authenticator: Option<Authenticator>,
    fallback: Option<TenantCredentials>,
}

impl AuthGate {
    /// Tokens required on every call
    pub fn enabled(authenticator: Authenticator) -> Self {
        Self {
            authenticator: Some(authenticator),
            fallback: None,
        }
    }

    /// No authentication. Tool calls use `fallback` credentials, if any.
    pub fn disabled(fallback: Option<TenantCredentials>) -> Self {
        Self {
            authenticator: None,
            fallback,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.authenticator.is_some()
    }

    pub fn authenticator(&self) -> Option<&Authenticator> {
        self.authenticator.as_ref()
    }

    /// Resolve the caller. `Ok(None)` only when authentication is disabled.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Option<Identity>, AuthError> {
        let Some(authenticator) = &self.authenticator else {
            return Ok(None);
        };
        match authenticator.validate(header) {
            Ok(identity) => Ok(Some(identity)),
            Err(e) => {
                tracing::warn!(code = e.code(), "Authentication failed: {}", e);
                Err(e)
            }
        }
    }

    /// Authorize an already authenticated caller.
    ///
    /// `required` overrides the registry lookup. Without an identity (auth
    /// disabled) every call is allowed.
    pub fn authorize(
        &self,
        identity: Option<&Identity>,
        operation: &str,
        required: Option<&[Scope]>,
    ) -> Result<(), AuthError> {
        match (identity, required) {
            (None, _) => Ok(()),
            (Some(identity), Some(required)) => {
                guard::authorize_with(identity, operation, required)
            }
            (Some(identity), None) => guard::authorize(identity, operation),
        }
    }

    /// Run `call` for `operation` once the caller is authenticated and
    /// authorized. The identity is visible through
    /// [`context::current_identity`] for exactly the duration of `call`.
    pub async fn invoke<F, T, E>(
        &self,
        header: Option<&str>,
        operation: &str,
        required: Option<&[Scope]>,
        call: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<AuthError>,
    {
        let identity = self.authenticate(header)?;
        self.authorize(identity.as_ref(), operation, required)?;

        match identity {
            Some(identity) => {
                tracing::debug!(user_id = %identity.user_id(), operation, "Invoking tool");
                context::with_identity(Arc::new(identity), call).await
            }
            None => call.await,
        }
    }

    /// Credentials for the downstream platform in the current call.
    ///
    /// The only place configured fallback credentials are ever used, and
    /// only when no identity is bound.
    pub fn tenant_credentials(&self) -> Result<TenantCredentials, AuthError> {
        let bound = context::current_identity();
        credentials::resolve_credentials(
            bound.as_deref().map(Identity::credentials),
            self.fallback.as_ref(),
        )
    }
}
