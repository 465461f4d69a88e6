//! Bluefitt Connect dashboard library.
//!
//! Server-rendered catalog, blog, user administration and account settings
//! on top of Firebase (Identity Toolkit for sign-in, Firestore for data).
//!
//! The router is built by [`app`] so the binary and the tests share the same
//! middleware stack. Tracing and Sentry layers are added by the binary.
//!
//! # Degraded mode
//!
//! When the Firebase settings are missing or still placeholders the dashboard
//! still starts. Pages render, sign-in is disabled and data reads show an
//! error panel instead of failing the request.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod components;
pub mod config;
pub mod error;
pub mod filters;
pub mod firebase;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::services::ServeDir;

use crate::middleware::{create_session_layer, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Directory served under `/static`.
pub const STATIC_DIR: &str = "crates/dashboard/static";

/// Build the dashboard router with its session and header middleware.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}
