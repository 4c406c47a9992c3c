//! API server and routes

pub mod auth;
pub mod routes;
mod server;
pub mod types;

pub use auth::{AuthGate, Authenticator};
pub use server::{ApiServer, router};
