//! Application state management.
//!
//! Defines the shared application state passed to request handlers:
//! - Configuration
//! - MongoDB client and database
//! - JWT authenticator guarding the product routes

use axum_helpers::JwtAuth;
use mongodb::{Client, Database};

/// Shared application state.
///
/// Cloned for each handler (inexpensive Arc clones under the hood).
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// MongoDB client (cloneable, shares underlying connection pool)
    pub mongo_client: Client,
    /// MongoDB database instance
    pub db: Database,
    /// JWT verifier for the auth middleware
    pub auth: JwtAuth,
}
