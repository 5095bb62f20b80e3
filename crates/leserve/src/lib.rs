//! leserve - HTTP Server
//!
//! *Le Serve* (The Server) - Axum-based REST API for onboarding request tracking

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// API error types
pub mod error;

/// HTTP handlers for REST endpoints
pub mod handlers;

/// Server configuration from TOML or environment
pub mod config;

/// API response types matching the operations UI contract
pub mod responses;

/// Server instance management
pub mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use handlers::{build_app, create_router, AppState};
pub use server::LeServeServer;
