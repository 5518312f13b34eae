//! Storefront Payments API Library
//!
//! Payment-intent creation, callback verification and order reconciliation
//! for the storefront backend, with best-effort shipping and notification
//! side effects.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod clients;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

/// Versioned API routes
pub fn api_v1_routes() -> Router<AppState> {
    Router::new().nest("/payments", handlers::payments::payment_routes())
}

/// Builds the full application router. Shared between the binary and the
/// integration tests so both exercise the same routing and layers.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "storefront-api up" }))
        .nest("/api/v1", api_v1_routes())
        .nest("/health", handlers::health::health_routes())
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}
