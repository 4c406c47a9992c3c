//! Authorization guard
//!
//! Pure decisions against the static registry. Rejections report only the
//! scopes the caller lacks.

use super::context::Identity;
use super::error::AuthError;
use super::scopes::{self, Scope};

/// Check `identity` against the registry entry for `operation`
pub fn authorize(identity: &Identity, operation: &str) -> Result<(), AuthError> {
    authorize_with(identity, operation, scopes::required_permissions(operation))
}

/// Check `identity` against an explicit requirement list.
///
/// Used when the requirement depends on call arguments rather than the
/// operation name alone.
pub fn authorize_with(
    identity: &Identity,
    operation: &str,
    required: &[Scope],
) -> Result<(), AuthError> {
    if scopes::is_satisfied(identity.scopes(), required) {
        return Ok(());
    }

    let missing: Vec<String> = scopes::missing_permissions(identity.scopes(), required)
        .into_iter()
        .map(|scope| scope.as_str().to_string())
        .collect();
    tracing::warn!(
        user_id = %identity.user_id(),
        operation,
        missing = %missing.join(","),
        "Authorization denied"
    );
    Err(AuthError::Authorization {
        operation: operation.to_string(),
        missing,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::api::auth::credentials::TenantCredentials;
    use crate::api::auth::scopes::{ScopeBundle, TOOL_SCOPES};

    fn identity(granted: &[Scope]) -> Identity {
        Identity::new(
            "user-1",
            granted.iter().map(|s| s.as_str().to_string()).collect(),
            TenantCredentials::new("1", "t", None),
            None,
        )
    }

    #[test]
    fn test_missing_scope_reported_exactly() {
        let id = identity(&[Scope::ProjectsRead]);
        let err = authorize_with(
            &id,
            "update_project",
            &[Scope::ProjectsRead, Scope::ProjectsWrite],
        )
        .unwrap_err();
        assert_eq!(
            err,
            AuthError::Authorization {
                operation: "update_project".to_string(),
                missing: vec!["qc:projects:write".to_string()],
            }
        );
    }

    #[test]
    fn test_message_does_not_leak_grants() {
        let id = identity(&[Scope::ProjectsRead, Scope::BacktestsRead, Scope::AiRead]);
        let err = authorize(&id, "delete_project").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("qc:projects:delete"));
        assert!(!message.contains("qc:backtests:read"));
        assert!(!message.contains("qc:ai:read"));
    }

    #[test]
    fn test_registry_lookup() {
        let reader = identity(&[Scope::ProjectsRead]);
        assert!(authorize(&reader, "read_project").is_ok());
        assert!(authorize(&reader, "create_project").is_err());
    }

    #[test]
    fn test_unmapped_operation_is_allowed() {
        let id = identity(&[Scope::AccountRead]);
        assert!(authorize(&id, "not_a_registered_tool").is_ok());
        assert!(authorize_with(&id, "anything", &[]).is_ok());
    }

    #[test]
    fn test_admin_bundle_passes_every_tool() {
        let admin = identity(ScopeBundle::Admin.scopes());
        for (tool, _) in TOOL_SCOPES {
            assert!(authorize(&admin, tool).is_ok(), "{}", tool);
        }
    }

    #[test]
    fn test_broadcast_requires_admin_write() {
        let trader = identity(ScopeBundle::Trader.scopes());
        let err = authorize(&trader, "broadcast_live_command").unwrap_err();
        assert_eq!(
            err,
            AuthError::Authorization {
                operation: "broadcast_live_command".to_string(),
                missing: vec!["qc:admin:write".to_string()],
            }
        );
    }

    #[test]
    fn test_repeated_decisions_are_stable() {
        let id = identity(&[Scope::LiveRead]);
        let first: Vec<bool> = TOOL_SCOPES
            .iter()
            .map(|(tool, _)| authorize(&id, tool).is_ok())
            .collect();
        for _ in 0..3 {
            let again: Vec<bool> = TOOL_SCOPES
                .iter()
                .map(|(tool, _)| authorize(&id, tool).is_ok())
                .collect();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_case_sensitive_grants() {
        let id = Identity::new(
            "u",
            ["QC:PROJECTS:READ".to_string(), " qc:projects:read".to_string()]
                .into_iter()
                .collect::<BTreeSet<_>>(),
            TenantCredentials::new("1", "t", None),
            None,
        );
        assert!(authorize(&id, "read_project").is_err());
    }
}
