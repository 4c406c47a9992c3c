//! Core application

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;

use crate::api::auth::scopes::{self, Scope};
use crate::api::auth::{TenantCredentials, extract_bearer_token, permissions_for_bundle};
use crate::api::{ApiServer, AuthGate, Authenticator};
use crate::core::banner;
use crate::core::cli::{self, CliConfig, Commands, SecretCommands, TokenCommands};
use crate::core::config::{AppConfig, AuthConfig};
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::utils::crypto;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub gate: Arc<AuthGate>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Secret {
                command: SecretCommands::Generate,
            }) => {
                println!("{}", crypto::generate_signing_secret());
                Ok(())
            }
            Some(Commands::Token { command }) => {
                let config = AppConfig::load(&cli_config)?;
                println!("{}", Self::handle_token_command(&config.auth, command)?);
                Ok(())
            }
            Some(Commands::Start) | None => {
                let app = Self::init(&cli_config)?;
                Self::start_server(app).await
            }
        }
    }

    fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        scopes::verify_registry().context("Scope registry self-check failed")?;
        let gate = Arc::new(build_gate(&config.auth)?);

        Ok(Self {
            shutdown: ShutdownService::new(),
            config,
            gate,
        })
    }

    fn handle_token_command(auth: &AuthConfig, command: TokenCommands) -> Result<String> {
        let authenticator = Authenticator::new(&auth.token_settings()?, auth.token_ttl())
            .context("Failed to initialise token codec")?;

        match command {
            TokenCommands::Create {
                subject,
                bundle,
                scope,
                qc_user_id,
                qc_api_token,
                qc_organization_id,
                organization_id,
                ttl_hours,
            } => {
                let granted: BTreeSet<String> = match bundle {
                    Some(name) => permissions_for_bundle(&name)?
                        .into_iter()
                        .map(|s| s.as_str().to_string())
                        .collect(),
                    None => scope.into_iter().collect(),
                };
                for unknown in granted.iter().filter(|s| Scope::parse(s).is_none()) {
                    tracing::warn!(scope = %unknown, "Scope is not part of the known vocabulary");
                }

                let token = authenticator.create_token(
                    &subject,
                    granted,
                    TenantCredentials::new(qc_user_id, qc_api_token, qc_organization_id),
                    ttl_hours.map(|h| Duration::hours(i64::from(h))),
                    organization_id,
                )?;
                Ok(token)
            }
            TokenCommands::Inspect { token } => {
                let token = token.trim();
                let raw = if token.contains(' ') {
                    extract_bearer_token(token)?
                } else {
                    token
                };
                let identity = authenticator.validate_token(raw)?;
                let summary = serde_json::json!({
                    "user_id": identity.user_id(),
                    "scopes": identity.scopes(),
                    "tenant_user_id": identity.credentials().user_id(),
                    "organization_id": identity.organization_id(),
                });
                Ok(serde_json::to_string_pretty(&summary)?)
            }
        }
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        banner::print_banner(&app.config);

        let server = ApiServer::new(app.config.server.clone(), app.gate, app.shutdown);
        server.start().await
    }
}

/// Gate for the configured auth mode
fn build_gate(auth: &AuthConfig) -> Result<AuthGate> {
    if auth.enabled {
        let authenticator = Authenticator::new(&auth.token_settings()?, auth.token_ttl())
            .context("Failed to initialise token codec")?;
        tracing::debug!(
            algorithm = ?auth.algorithm,
            issuer = %auth.issuer,
            audience = %auth.audience,
            "Authentication enabled"
        );
        Ok(AuthGate::enabled(authenticator))
    } else {
        tracing::warn!(
            fallback = auth.fallback.is_some(),
            "Authentication DISABLED"
        );
        Ok(AuthGate::disabled(auth.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FileConfig;

    const SECRET: &str = "app-test-secret-0123456789abcdef";

    fn auth_config() -> AuthConfig {
        let cli = CliConfig {
            jwt_secret: Some(SECRET.to_string()),
            ..Default::default()
        };
        AppConfig::from_sources(&cli, FileConfig::default())
            .unwrap()
            .auth
    }

    fn create(bundle: Option<&str>, scope: Vec<&str>) -> Result<String> {
        CoreApp::handle_token_command(
            &auth_config(),
            TokenCommands::Create {
                subject: "alice".to_string(),
                bundle: bundle.map(str::to_string),
                scope: scope.into_iter().map(str::to_string).collect(),
                qc_user_id: "406922".to_string(),
                qc_api_token: "tok".to_string(),
                qc_organization_id: None,
                organization_id: Some("org-1".to_string()),
                ttl_hours: Some(1),
            },
        )
    }

    #[test]
    fn test_token_create_then_inspect() {
        let token = create(Some("readonly"), vec![]).unwrap();
        let summary = CoreApp::handle_token_command(
            &auth_config(),
            TokenCommands::Inspect {
                token: format!("Bearer {}", token),
            },
        )
        .unwrap();
        let summary: serde_json::Value = serde_json::from_str(&summary).unwrap();
        assert_eq!(summary["user_id"], "alice");
        assert_eq!(summary["tenant_user_id"], "406922");
        assert_eq!(summary["organization_id"], "org-1");
        assert_eq!(summary["scopes"].as_array().unwrap().len(), 9);
        assert!(!summary.to_string().contains("tok\""));
    }

    #[test]
    fn test_token_create_with_explicit_scopes() {
        let token = create(None, vec!["qc:projects:read", "qc:files:read"]).unwrap();
        let authenticator = Authenticator::new(
            &auth_config().token_settings().unwrap(),
            Duration::hours(1),
        )
        .unwrap();
        let identity = authenticator.validate_token(&token).unwrap();
        assert!(identity.has_scope(Scope::ProjectsRead));
        assert!(identity.has_scope(Scope::FilesRead));
        assert_eq!(identity.scopes().len(), 2);
    }

    #[test]
    fn test_token_create_unknown_bundle() {
        let err = create(Some("superuser"), vec![]).unwrap_err();
        assert!(err.to_string().contains("Unknown scope bundle"));
    }

    #[test]
    fn test_build_gate_modes() {
        assert!(build_gate(&auth_config()).unwrap().is_enabled());

        let mut disabled = auth_config();
        disabled.enabled = false;
        disabled.jwt_secret = None;
        assert!(!build_gate(&disabled).unwrap().is_enabled());
    }
}
