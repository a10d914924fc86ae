//! Axum HTTP handlers for the web server
//!
//! `mcp_endpoint` coordinates the life of one protocol request: it builds a server
//! instance for the resolved credentials, binds it to a fresh transport, runs the
//! exchange, and guarantees both are torn down exactly once.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use tracing::{error, info};

use crate::{
    credentials::Credentials,
    errors::AppError,
    lifecycle::Teardown,
    mcp::{factory::ServerFactory, server::ServerInstance},
    transport::{StreamableHttpTransport, TransportOptions},
    AppState,
};

const TESTER_PAGE: &str = include_str!("tester.html");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub mcp_endpoint: &'static str,
    pub http_endpoint: &'static str,
    pub stateless: bool,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn discovery() -> Json<DiscoveryResponse> {
    Json(DiscoveryResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        mcp_endpoint: "/mcp",
        http_endpoint: "/http",
        stateless: true,
    })
}

pub async fn tester_page() -> Html<&'static str> {
    Html(TESTER_PAGE)
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> AppError {
    info!(method = %method, path = %uri.path(), "rejected method on protocol endpoint");
    AppError::MethodNotAllowed
}

pub async fn mcp_endpoint(
    State(state): State<AppState>,
    Extension(credentials): Extension<Credentials>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (server, transport) = match connect_instance(state.factory.as_ref(), credentials) {
        Ok(pair) => pair,
        Err(err) => {
            error!(error = %err, "failed to set up server instance");
            return AppError::internal(err.to_string()).into_response();
        }
    };

    let teardown = Teardown::new(server, transport.handle());
    match transport
        .handle_request(&headers, body, teardown.guard())
        .await
    {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "error handling MCP request");
            AppError::internal(err.to_string()).into_response()
        }
    }
}

/// Builds a server instance bound to `credentials` and connects it to a new
/// stateless transport.
pub fn connect_instance(
    factory: &dyn ServerFactory,
    credentials: Credentials,
) -> Result<(Arc<dyn ServerInstance>, StreamableHttpTransport), AppError> {
    let server = factory.create(credentials)?;
    let mut transport = StreamableHttpTransport::new(TransportOptions::stateless());

    if let Err(err) = transport.connect(Arc::clone(&server)) {
        server.close();
        return Err(err.into());
    }
    Ok((server, transport))
}
