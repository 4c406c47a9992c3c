//! Scope registry
//!
//! The closed permission vocabulary, the tool → required-scopes table and the
//! named bundles. Everything here is static data; lookups never allocate
//! state and never change after startup.
//!
//! Tools missing from [`TOOL_SCOPES`] require no scopes: any authenticated
//! caller may invoke them.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use super::error::AuthError;

// ============================================================================
// Scope
// ============================================================================

/// A single grant, namespaced `qc:<resource>:<action>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    AccountRead,
    ProjectsRead,
    ProjectsWrite,
    ProjectsDelete,
    FilesRead,
    FilesWrite,
    FilesDelete,
    CompileExecute,
    BacktestsRead,
    BacktestsWrite,
    BacktestsDelete,
    OptimizationsRead,
    OptimizationsWrite,
    OptimizationsDelete,
    LiveRead,
    LiveWrite,
    LiveExecute,
    LiveDelete,
    ObjectsRead,
    ObjectsWrite,
    ObjectsDelete,
    AiRead,
    AiExecute,
    CollaborationRead,
    CollaborationWrite,
    CollaborationDelete,
    AdminRead,
    AdminWrite,
}

impl Scope {
    /// The full enumeration, in declaration order
    pub const ALL: [Scope; 28] = [
        Scope::AccountRead,
        Scope::ProjectsRead,
        Scope::ProjectsWrite,
        Scope::ProjectsDelete,
        Scope::FilesRead,
        Scope::FilesWrite,
        Scope::FilesDelete,
        Scope::CompileExecute,
        Scope::BacktestsRead,
        Scope::BacktestsWrite,
        Scope::BacktestsDelete,
        Scope::OptimizationsRead,
        Scope::OptimizationsWrite,
        Scope::OptimizationsDelete,
        Scope::LiveRead,
        Scope::LiveWrite,
        Scope::LiveExecute,
        Scope::LiveDelete,
        Scope::ObjectsRead,
        Scope::ObjectsWrite,
        Scope::ObjectsDelete,
        Scope::AiRead,
        Scope::AiExecute,
        Scope::CollaborationRead,
        Scope::CollaborationWrite,
        Scope::CollaborationDelete,
        Scope::AdminRead,
        Scope::AdminWrite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountRead => "qc:account:read",
            Self::ProjectsRead => "qc:projects:read",
            Self::ProjectsWrite => "qc:projects:write",
            Self::ProjectsDelete => "qc:projects:delete",
            Self::FilesRead => "qc:files:read",
            Self::FilesWrite => "qc:files:write",
            Self::FilesDelete => "qc:files:delete",
            Self::CompileExecute => "qc:compile:execute",
            Self::BacktestsRead => "qc:backtests:read",
            Self::BacktestsWrite => "qc:backtests:write",
            Self::BacktestsDelete => "qc:backtests:delete",
            Self::OptimizationsRead => "qc:optimizations:read",
            Self::OptimizationsWrite => "qc:optimizations:write",
            Self::OptimizationsDelete => "qc:optimizations:delete",
            Self::LiveRead => "qc:live:read",
            Self::LiveWrite => "qc:live:write",
            Self::LiveExecute => "qc:live:execute",
            Self::LiveDelete => "qc:live:delete",
            Self::ObjectsRead => "qc:objects:read",
            Self::ObjectsWrite => "qc:objects:write",
            Self::ObjectsDelete => "qc:objects:delete",
            Self::AiRead => "qc:ai:read",
            Self::AiExecute => "qc:ai:execute",
            Self::CollaborationRead => "qc:collaboration:read",
            Self::CollaborationWrite => "qc:collaboration:write",
            Self::CollaborationDelete => "qc:collaboration:delete",
            Self::AdminRead => "qc:admin:read",
            Self::AdminWrite => "qc:admin:write",
        }
    }

    /// Exact-match parse. No case folding, no trimming.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scope| scope.as_str() == s)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tool → scopes table
// ============================================================================

use Scope::*;

/// Required scopes per tool
pub const TOOL_SCOPES: &[(&str, &[Scope])] = &[
    // Account
    ("read_account", &[AccountRead]),
    // Projects
    ("create_project", &[ProjectsWrite]),
    ("read_project", &[ProjectsRead]),
    ("list_projects", &[ProjectsRead]),
    ("update_project", &[ProjectsWrite]),
    ("delete_project", &[ProjectsDelete]),
    // Project collaboration
    ("create_project_collaborator", &[CollaborationWrite]),
    ("read_project_collaborators", &[CollaborationRead]),
    ("update_project_collaborator", &[CollaborationWrite]),
    ("delete_project_collaborator", &[CollaborationDelete]),
    // Project nodes
    ("read_project_nodes", &[ProjectsRead]),
    ("update_project_nodes", &[ProjectsWrite]),
    // Compile
    ("create_compile", &[CompileExecute]),
    ("read_compile", &[ProjectsRead]),
    // Files
    ("create_file", &[FilesWrite]),
    ("read_file", &[FilesRead]),
    ("update_file_name", &[FilesWrite]),
    ("update_file_contents", &[FilesWrite]),
    ("delete_file", &[FilesDelete]),
    // Backtests
    ("create_backtest", &[BacktestsWrite]),
    ("read_backtest", &[BacktestsRead]),
    ("list_backtests", &[BacktestsRead]),
    ("read_backtest_chart", &[BacktestsRead]),
    ("read_backtest_orders", &[BacktestsRead]),
    ("read_backtest_insights", &[BacktestsRead]),
    ("update_backtest", &[BacktestsWrite]),
    ("delete_backtest", &[BacktestsDelete]),
    // Optimizations
    ("estimate_optimization_time", &[OptimizationsRead]),
    ("create_optimization", &[OptimizationsWrite]),
    ("read_optimization", &[OptimizationsRead]),
    ("list_optimizations", &[OptimizationsRead]),
    ("update_optimization", &[OptimizationsWrite]),
    ("abort_optimization", &[OptimizationsWrite]),
    ("delete_optimization", &[OptimizationsDelete]),
    // Live trading
    ("authorize_connection", &[LiveWrite]),
    ("create_live_algorithm", &[LiveWrite]),
    ("read_live_algorithm", &[LiveRead]),
    ("list_live_algorithms", &[LiveRead]),
    ("read_live_chart", &[LiveRead]),
    ("read_live_logs", &[LiveRead]),
    ("read_live_portfolio", &[LiveRead]),
    ("read_live_orders", &[LiveRead]),
    ("read_live_insights", &[LiveRead]),
    ("stop_live_algorithm", &[LiveExecute]),
    ("liquidate_live_algorithm", &[LiveExecute]),
    // Live commands
    ("create_live_command", &[LiveExecute]),
    ("broadcast_live_command", &[LiveExecute, AdminWrite]),
    // Object store
    ("upload_object", &[ObjectsWrite]),
    ("read_object_properties", &[ObjectsRead]),
    ("read_object_store_file_job_id", &[ObjectsRead]),
    ("read_object_store_file_download_url", &[ObjectsRead]),
    ("list_object_store_files", &[ObjectsRead]),
    ("delete_object", &[ObjectsDelete]),
    // AI
    ("check_initialization_errors", &[AiExecute]),
    ("complete_code", &[AiExecute]),
    ("enhance_error_message", &[AiExecute]),
    ("update_code_to_pep8", &[AiExecute]),
    ("check_syntax", &[AiExecute]),
    ("search_quantconnect", &[AiRead]),
    // Admin
    ("read_lean_versions", &[AdminRead]),
    ("read_mcp_server_version", &[AdminRead]),
];

static TOOL_INDEX: LazyLock<HashMap<&'static str, &'static [Scope]>> =
    LazyLock::new(|| TOOL_SCOPES.iter().copied().collect());

/// Required scopes for a tool. Unmapped tools require nothing.
pub fn required_permissions(tool: &str) -> &'static [Scope] {
    TOOL_INDEX.get(tool).copied().unwrap_or(&[])
}

/// Whether the tool appears in the registry at all
pub fn is_registered(tool: &str) -> bool {
    TOOL_INDEX.contains_key(tool)
}

/// `required ⊆ granted`, compared as exact strings
pub fn is_satisfied(granted: &BTreeSet<String>, required: &[Scope]) -> bool {
    required.iter().all(|scope| granted.contains(scope.as_str()))
}

/// `required − granted`, deduplicated, in registry order
pub fn missing_permissions(granted: &BTreeSet<String>, required: &[Scope]) -> Vec<Scope> {
    let missing: BTreeSet<Scope> = required
        .iter()
        .copied()
        .filter(|scope| !granted.contains(scope.as_str()))
        .collect();
    missing.into_iter().collect()
}

/// Startup self-check of the static table.
///
/// A duplicate or blank tool name means the table was edited badly; that is a
/// malfunction, not an access decision.
pub fn verify_registry() -> Result<(), AuthError> {
    let mut seen = HashSet::with_capacity(TOOL_SCOPES.len());
    for (tool, _) in TOOL_SCOPES {
        if tool.trim().is_empty() {
            return Err(AuthError::Internal(
                "scope registry contains a blank tool name".to_string(),
            ));
        }
        if !seen.insert(*tool) {
            return Err(AuthError::Internal(format!(
                "scope registry lists tool '{}' more than once",
                tool
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Bundles
// ============================================================================

const READONLY_SCOPES: &[Scope] = &[
    AccountRead,
    ProjectsRead,
    FilesRead,
    BacktestsRead,
    OptimizationsRead,
    LiveRead,
    ObjectsRead,
    AiRead,
    CollaborationRead,
];

const TRADER_SCOPES: &[Scope] = &[
    AccountRead,
    ProjectsRead,
    ProjectsWrite,
    FilesRead,
    FilesWrite,
    CompileExecute,
    BacktestsRead,
    BacktestsWrite,
    OptimizationsRead,
    OptimizationsWrite,
    LiveRead,
    LiveWrite,
    LiveExecute,
    ObjectsRead,
    ObjectsWrite,
    AiRead,
    AiExecute,
];

/// Named, pre-curated scope sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeBundle {
    ReadOnly,
    Trader,
    Admin,
}

impl ScopeBundle {
    pub const ALL: [ScopeBundle; 3] = [Self::ReadOnly, Self::Trader, Self::Admin];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadOnly => "readonly",
            Self::Trader => "trader",
            Self::Admin => "admin",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|bundle| bundle.name() == name)
    }

    pub fn scopes(&self) -> &'static [Scope] {
        match self {
            Self::ReadOnly => READONLY_SCOPES,
            Self::Trader => TRADER_SCOPES,
            Self::Admin => &Scope::ALL,
        }
    }
}

/// Resolve a bundle name to its scope set
pub fn permissions_for_bundle(name: &str) -> Result<BTreeSet<Scope>, AuthError> {
    ScopeBundle::parse(name)
        .map(|bundle| bundle.scopes().iter().copied().collect())
        .ok_or_else(|| AuthError::UnknownBundle(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn granted(scopes: &[Scope]) -> BTreeSet<String> {
        scopes.iter().map(|s| s.as_str().to_string()).collect()
    }

    #[test]
    fn test_scope_strings_are_unique_and_namespaced() {
        let strings: HashSet<&str> = Scope::ALL.iter().map(Scope::as_str).collect();
        assert_eq!(strings.len(), Scope::ALL.len());
        for s in strings {
            let parts: Vec<&str> = s.split(':').collect();
            assert_eq!(parts.len(), 3, "{}", s);
            assert_eq!(parts[0], "qc");
        }
    }

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(Scope::parse("qc:projects:read"), Some(Scope::ProjectsRead));
        assert_eq!(Scope::parse("QC:PROJECTS:READ"), None);
        assert_eq!(Scope::parse(" qc:projects:read"), None);
        assert_eq!(Scope::parse("qc:projects:*"), None);
        for scope in Scope::ALL {
            assert_eq!(Scope::parse(scope.as_str()), Some(scope));
        }
    }

    #[test]
    fn test_required_permissions_lookup() {
        assert_eq!(required_permissions("create_project"), &[ProjectsWrite]);
        assert_eq!(
            required_permissions("broadcast_live_command"),
            &[LiveExecute, AdminWrite]
        );
    }

    #[test]
    fn test_unmapped_tool_requires_nothing() {
        assert!(required_permissions("no_such_tool").is_empty());
        assert!(!is_registered("no_such_tool"));
        assert!(is_satisfied(
            &BTreeSet::new(),
            required_permissions("no_such_tool")
        ));
    }

    #[test]
    fn test_registry_has_every_tool() {
        assert_eq!(TOOL_SCOPES.len(), 61);
        assert!(verify_registry().is_ok());
        for (tool, scopes) in TOOL_SCOPES {
            assert!(is_registered(tool));
            assert!(!scopes.is_empty(), "{} has no scopes", tool);
        }
    }

    #[test]
    fn test_is_satisfied_subset_law() {
        let user = granted(&[ProjectsRead, FilesRead]);
        assert!(is_satisfied(&user, &[]));
        assert!(is_satisfied(&user, &[ProjectsRead]));
        assert!(is_satisfied(&user, &[ProjectsRead, FilesRead]));
        assert!(!is_satisfied(&user, &[ProjectsRead, ProjectsWrite]));
        assert!(is_satisfied(&BTreeSet::new(), &[]));
        assert!(!is_satisfied(&BTreeSet::new(), &[AccountRead]));
    }

    #[test]
    fn test_is_satisfied_exhaustive_small_sets() {
        let universe = [ProjectsRead, ProjectsWrite, FilesRead];
        for g in 0u8..8 {
            for r in 0u8..8 {
                let pick = |mask: u8| -> Vec<Scope> {
                    universe
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| mask & (1 << i) != 0)
                        .map(|(_, s)| *s)
                        .collect()
                };
                let user = granted(&pick(g));
                let required = pick(r);
                let subset = r & !g == 0;
                assert_eq!(is_satisfied(&user, &required), subset, "g={g} r={r}");
            }
        }
    }

    #[test]
    fn test_unknown_granted_strings_never_satisfy() {
        let mut user = BTreeSet::new();
        user.insert("qc:projects:*".to_string());
        user.insert("Qc:Projects:Read".to_string());
        user.insert("qc:projects:read ".to_string());
        assert!(!is_satisfied(&user, &[ProjectsRead]));
    }

    #[test]
    fn test_missing_permissions_is_difference() {
        let user = granted(&[ProjectsRead]);
        assert_eq!(
            missing_permissions(&user, &[ProjectsRead, ProjectsWrite]),
            vec![ProjectsWrite]
        );
        assert!(missing_permissions(&user, &[ProjectsRead]).is_empty());
        assert_eq!(
            missing_permissions(&BTreeSet::new(), &[AdminWrite, AdminWrite]),
            vec![AdminWrite]
        );
    }

    #[test]
    fn test_bundles() {
        let admin = permissions_for_bundle("admin").unwrap();
        assert_eq!(admin.len(), Scope::ALL.len());

        let readonly = permissions_for_bundle("readonly").unwrap();
        assert_eq!(readonly.len(), 9);
        assert!(readonly.iter().all(|s| s.as_str().ends_with(":read")));
        assert!(!readonly.contains(&AdminRead));

        let trader = permissions_for_bundle("trader").unwrap();
        assert_eq!(trader.len(), 17);
        assert!(trader.contains(&LiveExecute));
        assert!(!trader.contains(&AdminWrite));
        assert!(!trader.iter().any(|s| s.as_str().ends_with(":delete")));
    }

    #[test]
    fn test_unknown_bundle() {
        assert_eq!(
            permissions_for_bundle("superuser"),
            Err(AuthError::UnknownBundle("superuser".to_string()))
        );
        assert!(permissions_for_bundle("Admin").is_err());
    }

    #[test]
    fn test_admin_bundle_satisfies_every_tool() {
        let admin: BTreeSet<String> = permissions_for_bundle("admin")
            .unwrap()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        for (tool, _) in TOOL_SCOPES {
            assert!(is_satisfied(&admin, required_permissions(tool)), "{}", tool);
        }
    }
}
