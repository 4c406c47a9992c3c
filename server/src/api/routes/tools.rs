//! Tool listing and invocation endpoints
//!
//! Invocation runs through [`AuthGate::invoke`]. The dispatcher only
//! materialises the tenant's downstream credentials and echoes the call; the
//! platform client itself lives elsewhere.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::auth::middleware::authorization_header;
use crate::api::auth::scopes::{self, Scope, TOOL_SCOPES};
use crate::api::auth::{AuthGate, Caller, current_identity, require_auth};
use crate::api::types::ApiError;

// ============================================================================
// State
// ============================================================================

#[derive(Clone)]
pub struct ToolsApiState {
    pub gate: Arc<AuthGate>,
}

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub required_scopes: Vec<&'static str>,
    pub allowed: bool,
}

#[derive(Debug, Serialize)]
pub struct ToolListResponse {
    pub authenticated: bool,
    pub tools: Vec<ToolInfo>,
}

#[derive(Debug, Serialize)]
pub struct ToolCallResponse {
    pub tool: String,
    pub user_id: Option<String>,
    pub tenant_user_id: String,
    pub organization_id: Option<String>,
    pub timestamp: i64,
    /// Names only; values carry derived secrets
    pub downstream_headers: Vec<&'static str>,
    pub arguments: Map<String, Value>,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(gate: Arc<AuthGate>) -> Router<()> {
    let listing = Router::new()
        .route("/", get(list_tools))
        .route_layer(axum::middleware::from_fn_with_state(
            gate.clone(),
            require_auth,
        ));

    Router::new()
        .route("/{name}", post(call_tool))
        .merge(listing)
        .with_state(ToolsApiState { gate })
}

// ============================================================================
// Handlers
// ============================================================================

/// List every registered tool and whether the caller may invoke it
pub async fn list_tools(Extension(Caller(identity)): Extension<Caller>) -> Json<ToolListResponse> {
    let tools = TOOL_SCOPES
        .iter()
        .map(|&(name, required)| ToolInfo {
            name,
            required_scopes: required.iter().map(Scope::as_str).collect(),
            allowed: identity
                .as_ref()
                .is_none_or(|id| scopes::is_satisfied(id.scopes(), required)),
        })
        .collect();

    Json(ToolListResponse {
        authenticated: identity.is_some(),
        tools,
    })
}

/// Invoke a tool. The body is a JSON object of arguments.
pub async fn call_tool(
    State(state): State<ToolsApiState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<ToolCallResponse>, ApiError> {
    let header = if state.gate.is_enabled() {
        authorization_header(&headers)?
    } else {
        None
    };
    // Bad arguments are reported only after the caller is authenticated
    let arguments = parse_arguments(&body);
    let required = arguments
        .as_ref()
        .ok()
        .and_then(|args| call_requirements(&name, args));

    let gate = state.gate.clone();
    let tool = name.clone();
    let response = gate
        .invoke(header, &name, required.as_deref(), async move {
            arguments.and_then(|arguments| dispatch(&state.gate, tool, arguments))
        })
        .await?;
    Ok(Json(response))
}

fn parse_arguments(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::bad_request(
            "INVALID_ARGUMENTS",
            "Tool arguments must be a JSON object",
        )),
        Err(e) => Err(ApiError::bad_request(
            "INVALID_ARGUMENTS",
            format!("Invalid JSON body: {}", e),
        )),
    }
}

/// Requirements that depend on call arguments. `None` means the registry
/// entry applies as is.
pub fn call_requirements(tool: &str, arguments: &Map<String, Value>) -> Option<Vec<Scope>> {
    match tool {
        "create_live_command"
            if arguments.get("broadcast").and_then(Value::as_bool) == Some(true) =>
        {
            let mut required = scopes::required_permissions(tool).to_vec();
            if !required.contains(&Scope::AdminWrite) {
                required.push(Scope::AdminWrite);
            }
            Some(required)
        }
        _ => None,
    }
}

fn dispatch(
    gate: &AuthGate,
    tool: String,
    arguments: Map<String, Value>,
) -> Result<ToolCallResponse, ApiError> {
    if !scopes::is_registered(&tool) {
        return Err(ApiError::not_found(
            "TOOL_NOT_FOUND",
            format!("Unknown tool: {}", tool),
        ));
    }

    let credentials = gate.tenant_credentials()?;
    let timestamp = Utc::now().timestamp();
    let downstream = credentials.auth_headers(timestamp);
    let identity = current_identity();

    tracing::info!(
        tool = %tool,
        user_id = identity.as_ref().map(|id| id.user_id()).unwrap_or("-"),
        tenant_user_id = %credentials.user_id(),
        "Tool call accepted"
    );

    Ok(ToolCallResponse {
        tool,
        user_id: identity.as_ref().map(|id| id.user_id().to_string()),
        tenant_user_id: credentials.user_id().to_string(),
        organization_id: identity
            .as_ref()
            .and_then(|id| id.organization_id())
            .or(credentials.organization_id())
            .map(str::to_string),
        timestamp,
        downstream_headers: downstream.headers().into_iter().map(|(k, _)| k).collect(),
        arguments,
    })
}
