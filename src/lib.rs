//! Tubely: video upload, faststart processing, and object storage.

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use state::AppState;

/// The full application router with state attached.
pub fn app(state: AppState) -> Router {
    routes::routes::routes().with_state(state)
}
