//! Authentication and authorization core
//!
//! Bearer tokens carry the caller, their granted scopes and their tenant's
//! downstream credentials. Every tool call passes through [`AuthGate`]:
//! authenticate, authorize against the scope registry, then bind the
//! identity to the call.

pub mod context;
pub mod credentials;
mod error;
pub mod gate;
pub mod guard;
pub mod jwt;
mod manager;
pub mod middleware;
pub mod scopes;

pub use context::{Identity, current_identity, with_identity, with_identity_sync};
pub use credentials::{DownstreamAuth, TenantCredentials, resolve_credentials};
pub use error::AuthError;
pub use gate::AuthGate;
pub use guard::{authorize, authorize_with};
pub use jwt::{TokenClaims, TokenCodec, TokenSettings, extract_bearer_token, parse_algorithm};
pub use manager::Authenticator;
pub use middleware::{Caller, require_auth};
pub use scopes::{Scope, ScopeBundle, permissions_for_bundle, required_permissions};
