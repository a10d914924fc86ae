use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod config;
pub mod credentials;
pub mod dataforseo_client;
pub mod domain;
pub mod errors;
pub mod http;
pub mod lifecycle;
pub mod logging;
pub mod mcp;
pub mod transport;

use credentials::Credentials;
use mcp::factory::ServerFactory;

/// Process-wide state. Read-only after startup; everything request-specific lives
/// in the request's own lifecycle.
#[derive(Clone)]
pub struct AppState {
    pub default_credentials: Option<Arc<Credentials>>,
    pub factory: Arc<dyn ServerFactory>,
}

impl AppState {
    pub fn new(default_credentials: Option<Credentials>, factory: Arc<dyn ServerFactory>) -> Self {
        Self {
            default_credentials: default_credentials.map(Arc::new),
            factory,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let protocol = post(http::handlers::mcp_endpoint)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_credentials,
        ))
        .get(http::handlers::method_not_allowed)
        .delete(http::handlers::method_not_allowed);

    Router::new()
        .route("/", get(http::handlers::tester_page))
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .route("/mcp", protocol.clone())
        .route("/http", protocol)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
