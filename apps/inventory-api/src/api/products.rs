//! Products API routes
//!
//! Wires the products domain to HTTP routes, with the JWT auth gate in
//! front of every endpoint.

use axum::Router;
use axum_helpers::jwt_auth_middleware;
use domain_products::{MongoProductRepository, ProductService, handlers};

use crate::state::AppState;

/// Create the products router
pub fn router(state: &AppState) -> Router {
    // Create the MongoDB repository
    let repository = MongoProductRepository::new(&state.db);

    // Create the service
    let service = ProductService::new(repository);

    // The auth middleware short-circuits with 401 before any product
    // handler runs.
    handlers::router(service).layer(axum::middleware::from_fn_with_state(
        state.auth.clone(),
        jwt_auth_middleware,
    ))
}
