//! HTTP route handlers for the app server.
//!
//! # Route Structure
//!
//! ```text
//! GET  /               - Install page; with ?shop= redirects to /app
//! GET  /app            - Authenticated landing for an installed shop
//! GET  /auth/callback  - OAuth callback (code -> offline token)
//! POST /webhooks       - Webhook receiver (app/installed,
//!                        app/scopes_update, app/uninstalled)
//! ```

pub mod auth;
pub mod home;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create all routes for the app server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/app", get(auth::app_home))
        .route("/auth/callback", get(auth::callback))
        .route("/webhooks", post(webhooks::receive))
}
