use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use jsonwebtoken::Algorithm;
use serde::Deserialize;

use crate::api::auth::{TenantCredentials, TokenSettings, parse_algorithm};

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_JWT_ALGORITHM, DEFAULT_JWT_AUDIENCE,
    DEFAULT_JWT_ISSUER, DEFAULT_PORT, DEFAULT_TOKEN_TTL_HOURS, MIN_JWT_SECRET_BYTES,
};

// =============================================================================
// File Config (all optional, for merging)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Credentials used when authentication is disabled
#[derive(Default, Clone, Deserialize)]
pub struct FallbackFileConfig {
    pub user_id: Option<String>,
    pub api_token: Option<String>,
    pub organization_id: Option<String>,
}

impl fmt::Debug for FallbackFileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackFileConfig")
            .field("user_id", &self.user_id)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("organization_id", &self.organization_id)
            .finish()
    }
}

/// Authentication configuration section
#[derive(Default, Clone, Deserialize)]
pub struct AuthFileConfig {
    pub enabled: Option<bool>,
    pub jwt_secret: Option<String>,
    pub algorithm: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub leeway_secs: Option<u64>,
    pub token_ttl_hours: Option<u32>,
    pub fallback: Option<FallbackFileConfig>,
}

impl fmt::Debug for AuthFileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthFileConfig")
            .field("enabled", &self.enabled)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_secs", &self.leeway_secs)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("fallback", &self.fallback)
            .finish()
    }
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub auth: Option<AuthFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        // Server
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
            if server.port.is_some() {
                tracing::trace!(port = ?server.port, "Merging server.port");
                current.port = server.port;
            }
        }

        // Auth
        if let Some(auth) = other.auth {
            let current = self.auth.get_or_insert_with(AuthFileConfig::default);
            if auth.enabled.is_some() {
                current.enabled = auth.enabled;
            }
            if auth.jwt_secret.is_some() {
                tracing::trace!("Merging auth.jwt_secret");
                current.jwt_secret = auth.jwt_secret;
            }
            if auth.algorithm.is_some() {
                current.algorithm = auth.algorithm;
            }
            if auth.issuer.is_some() {
                current.issuer = auth.issuer;
            }
            if auth.audience.is_some() {
                current.audience = auth.audience;
            }
            if auth.leeway_secs.is_some() {
                current.leeway_secs = auth.leeway_secs;
            }
            if auth.token_ttl_hours.is_some() {
                current.token_ttl_hours = auth.token_ttl_hours;
            }
            if let Some(fallback) = auth.fallback {
                let current_fallback = current
                    .fallback
                    .get_or_insert_with(FallbackFileConfig::default);
                if fallback.user_id.is_some() {
                    current_fallback.user_id = fallback.user_id;
                }
                if fallback.api_token.is_some() {
                    current_fallback.api_token = fallback.api_token;
                }
                if fallback.organization_id.is_some() {
                    current_fallback.organization_id = fallback.organization_id;
                }
            }
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Authentication configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub enabled: bool,
    pub jwt_secret: Option<String>,
    pub algorithm: Algorithm,
    pub issuer: String,
    pub audience: String,
    pub leeway_secs: u64,
    pub token_ttl_hours: u32,
    /// Honoured only while `enabled` is false
    pub fallback: Option<TenantCredentials>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.enabled)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_secs", &self.leeway_secs)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl AuthConfig {
    /// Signing and verification settings; requires a secret
    pub fn token_settings(&self) -> Result<TokenSettings> {
        let secret = self.jwt_secret.as_deref().with_context(|| {
            format!(
                "No token signing secret configured. Set {} or auth.jwt_secret",
                super::constants::ENV_JWT_SECRET
            )
        })?;
        Ok(TokenSettings {
            secret: secret.as_bytes().to_vec(),
            algorithm: self.algorithm,
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            leeway_secs: self.leeway_secs,
        })
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::hours(i64::from(self.token_ttl_hours))
    }
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.tradegate/tradegate.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Profile dir - skip if not exists
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_home(path);
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::from_sources(cli, file_config)
    }

    /// Layer defaults, merged file config and CLI/env values, then validate
    pub fn from_sources(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_server = file_config.server.unwrap_or_default();
        let file_auth = file_config.auth.unwrap_or_default();
        let file_fallback = file_auth.fallback.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        // auth.enabled: file config sets default, --no-auth CLI flag disables
        let enabled = if cli.no_auth {
            false
        } else {
            file_auth.enabled.unwrap_or(true)
        };

        let algorithm_name = cli
            .jwt_algorithm
            .clone()
            .or(file_auth.algorithm)
            .unwrap_or_else(|| DEFAULT_JWT_ALGORITHM.to_string());
        let algorithm = parse_algorithm(&algorithm_name).with_context(|| {
            format!(
                "Configuration error: unsupported token algorithm '{}'. Valid options: HS256, HS384, HS512",
                algorithm_name
            )
        })?;

        let fallback_user_id = cli
            .fallback_qc_user_id
            .clone()
            .or(file_fallback.user_id)
            .filter(|v| !v.is_empty());
        let fallback_api_token = cli
            .fallback_qc_api_token
            .clone()
            .or(file_fallback.api_token)
            .filter(|v| !v.is_empty());
        let fallback_org = cli
            .fallback_qc_organization_id
            .clone()
            .or(file_fallback.organization_id);
        let fallback = match (fallback_user_id, fallback_api_token) {
            (Some(user_id), Some(api_token)) => {
                Some(TenantCredentials::new(user_id, api_token, fallback_org))
            }
            (None, None) => None,
            _ => anyhow::bail!(
                "Configuration error: fallback user id and API token must be set together"
            ),
        };

        let config = AppConfig {
            server: ServerConfig { host, port },
            auth: AuthConfig {
                enabled,
                jwt_secret: cli
                    .jwt_secret
                    .clone()
                    .or(file_auth.jwt_secret)
                    .filter(|s| !s.is_empty()),
                algorithm,
                issuer: cli
                    .jwt_issuer
                    .clone()
                    .or(file_auth.issuer)
                    .unwrap_or_else(|| DEFAULT_JWT_ISSUER.to_string()),
                audience: cli
                    .jwt_audience
                    .clone()
                    .or(file_auth.audience)
                    .unwrap_or_else(|| DEFAULT_JWT_AUDIENCE.to_string()),
                leeway_secs: cli.jwt_leeway.or(file_auth.leeway_secs).unwrap_or(0),
                token_ttl_hours: file_auth
                    .token_ttl_hours
                    .unwrap_or(DEFAULT_TOKEN_TTL_HOURS),
                fallback,
            },
        };

        config.validate()?;
        tracing::debug!(config = ?config, "Configuration resolved");
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.auth.issuer.is_empty() || self.auth.audience.is_empty() {
            anyhow::bail!("Configuration error: auth.issuer and auth.audience must not be empty");
        }

        if self.auth.token_ttl_hours == 0 {
            anyhow::bail!("Configuration error: auth.token_ttl_hours must be greater than 0");
        }

        match &self.auth.jwt_secret {
            Some(secret) if secret.len() < MIN_JWT_SECRET_BYTES => {
                anyhow::bail!(
                    "Configuration error: token signing secret must be at least {} bytes",
                    MIN_JWT_SECRET_BYTES
                );
            }
            None if self.auth.enabled => {
                anyhow::bail!(
                    "Configuration error: authentication is enabled but no signing secret is set ({} or auth.jwt_secret)",
                    super::constants::ENV_JWT_SECRET
                );
            }
            _ => {}
        }

        if self.auth.enabled && self.auth.fallback.is_some() {
            tracing::warn!("Fallback credentials are configured but ignored while authentication is enabled");
        }

        Ok(())
    }
}

/// Get the profile config path (~/.tradegate/tradegate.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
