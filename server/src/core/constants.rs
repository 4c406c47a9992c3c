// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Tradegate";

/// Application name in lowercase (for log filters and identifiers)
pub const APP_NAME_LOWER: &str = "tradegate";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".tradegate";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "tradegate.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "TRADEGATE_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "TRADEGATE_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "TRADEGATE_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "TRADEGATE_LOG";

/// Environment variable to disable authentication
pub const ENV_NO_AUTH: &str = "TRADEGATE_NO_AUTH";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 8080;

/// Maximum request body size (tool arguments)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

// =============================================================================
// Environment Variables - Tokens
// =============================================================================

/// Environment variable for the token signing secret
pub const ENV_JWT_SECRET: &str = "TRADEGATE_JWT_SECRET";

/// Environment variable for the token signing algorithm
pub const ENV_JWT_ALGORITHM: &str = "TRADEGATE_JWT_ALGORITHM";

/// Environment variable for the expected token issuer
pub const ENV_JWT_ISSUER: &str = "TRADEGATE_JWT_ISSUER";

/// Environment variable for the expected token audience
pub const ENV_JWT_AUDIENCE: &str = "TRADEGATE_JWT_AUDIENCE";

/// Environment variable for clock skew leeway in seconds
pub const ENV_JWT_LEEWAY: &str = "TRADEGATE_JWT_LEEWAY";

// =============================================================================
// Token Defaults
// =============================================================================

pub const DEFAULT_JWT_ALGORITHM: &str = "HS256";
pub const DEFAULT_JWT_ISSUER: &str = "ledgai";
pub const DEFAULT_JWT_AUDIENCE: &str = "quantconnect-mcp";

/// Default lifetime of issued tokens in hours
pub const DEFAULT_TOKEN_TTL_HOURS: u32 = 24;

/// Minimum signing secret length in bytes (HS256 key size)
pub const MIN_JWT_SECRET_BYTES: usize = 32;

// =============================================================================
// Environment Variables - Fallback Credentials
// =============================================================================

/// Platform user id used when authentication is disabled
pub const ENV_QC_USER_ID: &str = "TRADEGATE_QC_USER_ID";

/// Platform API token used when authentication is disabled
pub const ENV_QC_API_TOKEN: &str = "TRADEGATE_QC_API_TOKEN";

/// Platform organization used when authentication is disabled
pub const ENV_QC_ORGANIZATION_ID: &str = "TRADEGATE_QC_ORGANIZATION_ID";
