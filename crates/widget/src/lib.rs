//! Virtual fitting room widget.
//!
//! Renders a product page with "View in Fitting Room" and "Add to Fitting
//! Room" buttons backed by a remote fitting room API. Exposed as a library
//! so the controller and gateway can be exercised from integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod navigation;
pub mod routes;
pub mod state;
pub mod token_store;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Build the widget router with its session layer.
///
/// Tracing, request ids and Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(session_layer)
        .with_state(state)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}
