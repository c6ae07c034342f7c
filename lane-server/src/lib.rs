//! lane-server: ordering backend for the Little Latte Lane restaurant
//!
//! Menu, checkout and order lifecycle, kitchen dashboard with live updates,
//! Yoco and PayFast payment settlement, restaurant closure and the visual
//! editor settings store.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod delivery;
pub mod error;
pub mod live;
pub mod payments;
pub mod services;
pub mod state;

pub use config::Config;
pub use state::AppState;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the fully layered application, used by the HTTP server and tests
pub fn build_app(state: AppState) -> Router {
    api::create_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
