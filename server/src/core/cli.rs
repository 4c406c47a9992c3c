use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    ENV_CONFIG, ENV_HOST, ENV_JWT_ALGORITHM, ENV_JWT_AUDIENCE, ENV_JWT_ISSUER, ENV_JWT_LEEWAY,
    ENV_JWT_SECRET, ENV_NO_AUTH, ENV_PORT, ENV_QC_API_TOKEN, ENV_QC_ORGANIZATION_ID,
    ENV_QC_USER_ID,
};

#[derive(Parser)]
#[command(name = "tradegate")]
#[command(version, about = "Multi-tenant trading tool server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Disable authentication (trusted development setups only)
    #[arg(long, global = true, env = ENV_NO_AUTH)]
    pub no_auth: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    // Token options
    /// Token signing secret
    #[arg(long, global = true, env = ENV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Token signing algorithm (HS256, HS384 or HS512)
    #[arg(long, global = true, env = ENV_JWT_ALGORITHM)]
    pub jwt_algorithm: Option<String>,

    /// Expected token issuer
    #[arg(long, global = true, env = ENV_JWT_ISSUER)]
    pub jwt_issuer: Option<String>,

    /// Expected token audience
    #[arg(long, global = true, env = ENV_JWT_AUDIENCE)]
    pub jwt_audience: Option<String>,

    /// Clock skew leeway in seconds
    #[arg(long, global = true, env = ENV_JWT_LEEWAY)]
    pub jwt_leeway: Option<u64>,

    // Fallback credentials (auth disabled only)
    /// Platform user id used when authentication is disabled
    #[arg(long, global = true, env = ENV_QC_USER_ID)]
    pub fallback_qc_user_id: Option<String>,

    /// Platform API token used when authentication is disabled
    #[arg(long, global = true, env = ENV_QC_API_TOKEN, hide_env_values = true)]
    pub fallback_qc_api_token: Option<String>,

    /// Platform organization used when authentication is disabled
    #[arg(long, global = true, env = ENV_QC_ORGANIZATION_ID)]
    pub fallback_qc_organization_id: Option<String>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Issue and inspect access tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
    /// Signing secret helpers
    Secret {
        #[command(subcommand)]
        command: SecretCommands,
    },
}

#[derive(Subcommand, Clone)]
pub enum TokenCommands {
    /// Print a signed token for internal use or testing
    Create {
        /// End-user id (`sub` claim)
        #[arg(long)]
        subject: String,

        /// Scope bundle (readonly, trader, admin)
        #[arg(long, conflicts_with = "scope", required_unless_present = "scope")]
        bundle: Option<String>,

        /// Individual scope, repeatable
        #[arg(long)]
        scope: Vec<String>,

        /// Platform user id
        #[arg(long)]
        qc_user_id: String,

        /// Platform API token
        #[arg(long)]
        qc_api_token: String,

        /// Platform organization carried inside the credential
        #[arg(long)]
        qc_organization_id: Option<String>,

        /// Organization claim
        #[arg(long)]
        organization_id: Option<String>,

        /// Lifetime in hours (defaults to the configured TTL)
        #[arg(long)]
        ttl_hours: Option<u32>,
    },
    /// Validate a token and print the identity it carries
    Inspect {
        /// Token, with or without the `Bearer ` prefix
        token: String,
    },
}

impl std::fmt::Debug for TokenCommands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create {
                subject,
                bundle,
                scope,
                qc_user_id,
                qc_api_token: _,
                qc_organization_id,
                organization_id,
                ttl_hours,
            } => f
                .debug_struct("Create")
                .field("subject", subject)
                .field("bundle", bundle)
                .field("scope", scope)
                .field("qc_user_id", qc_user_id)
                .field("qc_api_token", &"[REDACTED]")
                .field("qc_organization_id", qc_organization_id)
                .field("organization_id", organization_id)
                .field("ttl_hours", ttl_hours)
                .finish(),
            Self::Inspect { token: _ } => f
                .debug_struct("Inspect")
                .field("token", &"[REDACTED]")
                .finish(),
        }
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum SecretCommands {
    /// Print a fresh 256-bit signing secret
    Generate,
}

/// Configuration derived from CLI arguments
#[derive(Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub no_auth: bool,
    pub config: Option<PathBuf>,
    pub jwt_secret: Option<String>,
    pub jwt_algorithm: Option<String>,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub jwt_leeway: Option<u64>,
    pub fallback_qc_user_id: Option<String>,
    pub fallback_qc_api_token: Option<String>,
    pub fallback_qc_organization_id: Option<String>,
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("no_auth", &self.no_auth)
            .field("config", &self.config)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("jwt_leeway", &self.jwt_leeway)
            .field("fallback_qc_user_id", &self.fallback_qc_user_id)
            .field(
                "fallback_qc_api_token",
                &self.fallback_qc_api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("fallback_qc_organization_id", &self.fallback_qc_organization_id)
            .finish()
    }
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            no_auth: cli.no_auth,
            config: cli.config,
            jwt_secret: cli.jwt_secret,
            jwt_algorithm: cli.jwt_algorithm,
            jwt_issuer: cli.jwt_issuer,
            jwt_audience: cli.jwt_audience,
            jwt_leeway: cli.jwt_leeway,
            fallback_qc_user_id: cli.fallback_qc_user_id,
            fallback_qc_api_token: cli.fallback_qc_api_token,
            fallback_qc_organization_id: cli.fallback_qc_organization_id,
        }
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let mut cli = Cli::parse();
    let command = cli.command.take();
    (cli.into(), command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_command_debug_redacts_secrets() {
        let cli = Cli::try_parse_from([
            "tradegate",
            "token",
            "create",
            "--subject",
            "alice",
            "--scope",
            "qc:projects:read",
            "--qc-user-id",
            "406922",
            "--qc-api-token",
            "SUPER-SECRET-API-TOKEN",
        ])
        .unwrap();
        let dbg = format!("{:?}", cli.command);
        assert!(dbg.contains("alice"));
        assert!(dbg.contains("406922"));
        assert!(dbg.contains("[REDACTED]"));
        assert!(!dbg.contains("SUPER-SECRET-API-TOKEN"));

        let inspect = Commands::Token {
            command: TokenCommands::Inspect {
                token: "eyJhbGciOiJIUzI1NiJ9.payload.sig".to_string(),
            },
        };
        assert!(!format!("{:?}", inspect).contains("payload.sig"));
    }

    #[test]
    fn test_token_create_with_bundle() {
        let cli = Cli::try_parse_from([
            "tradegate",
            "token",
            "create",
            "--subject",
            "alice",
            "--bundle",
            "trader",
            "--qc-user-id",
            "406922",
            "--qc-api-token",
            "tok",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Token {
                command:
                    TokenCommands::Create {
                        subject, bundle, ..
                    },
            }) => {
                assert_eq!(subject, "alice");
                assert_eq!(bundle.as_deref(), Some("trader"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_token_create_needs_bundle_or_scope() {
        let result = Cli::try_parse_from([
            "tradegate",
            "token",
            "create",
            "--subject",
            "alice",
            "--qc-user-id",
            "1",
            "--qc-api-token",
            "t",
        ]);
        assert!(result.is_err());

        let result = Cli::try_parse_from([
            "tradegate",
            "token",
            "create",
            "--subject",
            "alice",
            "--bundle",
            "admin",
            "--scope",
            "qc:projects:read",
            "--qc-user-id",
            "1",
            "--qc-api-token",
            "t",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tradegate", "start", "--port", "9000", "--no-auth"])
            .unwrap();
        let config = CliConfig::from(cli);
        assert_eq!(config.port, Some(9000));
        assert!(config.no_auth);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = CliConfig {
            jwt_secret: Some("super-secret-value".to_string()),
            fallback_qc_api_token: Some("platform-token".to_string()),
            ..Default::default()
        };
        let dbg = format!("{:?}", config);
        assert!(!dbg.contains("super-secret-value"));
        assert!(!dbg.contains("platform-token"));
    }
}
