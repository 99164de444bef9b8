//! Sewa clinic engine HTTP server
//!
//! Wires the IPD, khata, appointment and lab services behind one axum
//! router. Storage is chosen at start-up (in-memory or PostgreSQL); handlers
//! only see the services.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;

pub use config::ClinicConfig;
pub use error::*;
pub use server::ClinicServer;

use axum::{middleware::from_fn, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the main application router with all routes and middleware
pub fn create_app(server: ClinicServer) -> Router {
    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::create_cors_layer())
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(server)
}
