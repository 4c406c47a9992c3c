//! Tradegate server: bearer-token authentication and per-tool scope
//! authorization for a multi-tenant trading tool server.

pub mod api;
mod app;
pub mod core;
pub mod utils;
