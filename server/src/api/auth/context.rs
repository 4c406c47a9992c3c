//! Authenticated identity and the per-call context carrier
//!
//! The identity of the caller is bound to the task executing the tool call,
//! so concurrent calls on the same runtime never observe each other's
//! tenant. Nothing is stored in process-wide mutable state.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use super::credentials::TenantCredentials;
use super::error::AuthError;
use super::jwt::TokenClaims;
use super::scopes::Scope;

/// Who is calling, what they may do, and which tenant they act for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_id: String,
    scopes: BTreeSet<String>,
    credentials: TenantCredentials,
    organization_id: Option<String>,
}

impl Identity {
    pub fn new(
        user_id: impl Into<String>,
        scopes: BTreeSet<String>,
        credentials: TenantCredentials,
        organization_id: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            scopes,
            credentials,
            organization_id: organization_id.filter(|org| !org.is_empty()),
        }
    }

    /// Build an identity from verified claims.
    ///
    /// A token without permissions or with incomplete credentials does not
    /// authenticate anyone.
    pub fn from_claims(claims: TokenClaims) -> Result<Self, AuthError> {
        if claims.scopes.is_empty() {
            return Err(AuthError::MissingScopes);
        }
        claims.credentials.validate()?;
        let organization_id = claims
            .organization_id
            .or_else(|| claims.credentials.organization_id().map(str::to_string));
        Ok(Self::new(
            claims.sub,
            claims.scopes,
            claims.credentials,
            organization_id,
        ))
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    pub fn credentials(&self) -> &TenantCredentials {
        &self.credentials
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.contains(scope.as_str())
    }
}

tokio::task_local! {
    static CURRENT_IDENTITY: Arc<Identity>;
}

/// Run `fut` with `identity` bound as the current caller.
///
/// The binding ends when the future completes, errors or is dropped, and the
/// outer binding (if any) is visible again afterwards.
pub async fn with_identity<F>(identity: Arc<Identity>, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_IDENTITY.scope(identity, fut).await
}

/// Synchronous variant of [`with_identity`]
pub fn with_identity_sync<R>(identity: Arc<Identity>, f: impl FnOnce() -> R) -> R {
    CURRENT_IDENTITY.sync_scope(identity, f)
}

/// Identity bound to the current call, if any
pub fn current_identity() -> Option<Arc<Identity>> {
    CURRENT_IDENTITY.try_with(Arc::clone).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(user: &str) -> Arc<Identity> {
        Arc::new(Identity::new(
            user,
            [Scope::ProjectsRead.as_str().to_string()]
                .into_iter()
                .collect(),
            TenantCredentials::new(format!("qc-{}", user), "tok", None),
            None,
        ))
    }

    fn claims() -> TokenClaims {
        TokenClaims {
            iss: "ledgai".to_string(),
            aud: "quantconnect-mcp".to_string(),
            sub: "user-1".to_string(),
            iat: 0,
            exp: 10,
            scopes: ["qc:projects:read".to_string()].into_iter().collect(),
            credentials: TenantCredentials::new("1", "t", Some("org-c".to_string())),
            organization_id: None,
        }
    }

    #[test]
    fn test_from_claims() {
        let id = Identity::from_claims(claims()).unwrap();
        assert_eq!(id.user_id(), "user-1");
        assert!(id.has_scope(Scope::ProjectsRead));
        assert!(!id.has_scope(Scope::ProjectsWrite));
        // Falls back to the credential's organization
        assert_eq!(id.organization_id(), Some("org-c"));
    }

    #[test]
    fn test_from_claims_prefers_top_level_org() {
        let mut c = claims();
        c.organization_id = Some("org-top".to_string());
        assert_eq!(
            Identity::from_claims(c).unwrap().organization_id(),
            Some("org-top")
        );
    }

    #[test]
    fn test_from_claims_rejects_empty_scopes() {
        let mut c = claims();
        c.scopes.clear();
        assert_eq!(Identity::from_claims(c), Err(AuthError::MissingScopes));
    }

    #[test]
    fn test_from_claims_rejects_incomplete_credentials() {
        let mut c = claims();
        c.credentials = TenantCredentials::new("1", "", None);
        assert!(matches!(
            Identity::from_claims(c),
            Err(AuthError::InvalidCredential(_))
        ));
    }

    #[tokio::test]
    async fn test_unset_outside_scope() {
        assert!(current_identity().is_none());
        with_identity(identity("a"), async {
            assert_eq!(current_identity().unwrap().user_id(), "a");
        })
        .await;
        assert!(current_identity().is_none());
    }

    #[tokio::test]
    async fn test_nested_scope_restores_outer() {
        with_identity(identity("outer"), async {
            with_identity(identity("inner"), async {
                assert_eq!(current_identity().unwrap().user_id(), "inner");
            })
            .await;
            assert_eq!(current_identity().unwrap().user_id(), "outer");
        })
        .await;
    }

    #[tokio::test]
    async fn test_cleared_after_error() {
        let result: Result<(), AuthError> = with_identity(identity("a"), async {
            Err(AuthError::Internal("boom".to_string()))
        })
        .await;
        assert!(result.is_err());
        assert!(current_identity().is_none());
    }

    #[tokio::test]
    async fn test_cleared_after_panic() {
        let handle = tokio::spawn(async {
            with_identity(identity("a"), async {
                panic!("tool failed");
            })
            .await
        });
        assert!(handle.await.is_err());
        assert!(current_identity().is_none());
    }

    #[test]
    fn test_sync_scope() {
        assert!(current_identity().is_none());
        let seen = with_identity_sync(identity("sync"), || {
            current_identity().map(|id| id.user_id().to_string())
        });
        assert_eq!(seen.as_deref(), Some("sync"));
        assert!(current_identity().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_are_isolated() {
        let mut handles = Vec::new();
        for i in 0..64 {
            handles.push(tokio::spawn(async move {
                let user = format!("user-{}", i);
                with_identity(identity(&user), async move {
                    for _ in 0..10 {
                        tokio::task::yield_now().await;
                        let current = current_identity().unwrap();
                        assert_eq!(current.user_id(), user);
                        assert_eq!(current.credentials().user_id(), format!("qc-{}", user));
                    }
                })
                .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
