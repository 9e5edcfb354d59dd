//! HTTP API server for relman.
//!
//! Thin axum layer over `relman-engine`: every handler checks the caller's
//! permission, maps the request body into an engine input and renders the
//! result or error as JSON.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use state::AppState;
