//! The request-scoped Model Context Protocol server
//!
//! An `McpServer` is built for exactly one HTTP exchange and owns the credentials of
//! that exchange. It dispatches JSON-RPC methods, negotiates the protocol version on
//! `initialize`, and routes tool calls to the upstream API.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use rust_mcp_sdk::schema::{
    Implementation, InitializeResult, ServerCapabilities, ServerCapabilitiesTools,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::dataforseo_client::SeoApi;
use crate::domain::tools::{handle_tools_call, ToolCatalog};
use crate::mcp::peer::Peer;
use crate::mcp::rpc::{is_json_rpc_error, json_rpc_error, json_rpc_result};
use crate::{
    credentials::Credentials,
    errors::{AppError, INTERNAL_ERROR_CODE, METHOD_NOT_FOUND_CODE},
};

pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];
pub const LATEST_PROTOCOL_VERSION: &str = SUPPORTED_PROTOCOL_VERSIONS[0];

/// A JSON-RPC request addressed to a server instance.
#[derive(Debug, Clone)]
pub struct RpcRequest {
    pub id: Value,
    pub method: String,
    pub params: Option<Value>,
}

/// Contract between the transport and a protocol-server instance.
#[async_trait]
pub trait ServerInstance: Send + Sync {
    /// Produces the response envelope for one request. `Err` is reserved for
    /// failures of the instance itself; protocol errors are returned as envelopes.
    async fn handle_request(&self, request: RpcRequest, peer: Peer) -> Result<Value, AppError>;

    async fn handle_notification(&self, method: &str, params: Option<Value>);

    /// Releases the instance. Must tolerate repeated calls.
    fn close(&self);
}

pub struct McpServer {
    credentials: Credentials,
    api: Arc<dyn SeoApi>,
    catalog: Arc<ToolCatalog>,
    closed: AtomicBool,
}

impl McpServer {
    pub fn new(credentials: Credentials, api: Arc<dyn SeoApi>, catalog: Arc<ToolCatalog>) -> Self {
        Self {
            credentials,
            api,
            catalog,
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn initialize(&self, id: Option<Value>, params: Option<&Value>) -> Value {
        let initialize_result = InitializeResult {
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                description: None,
                icons: vec![],
                website_url: None,
            },
            capabilities: ServerCapabilities {
                tools: Some(ServerCapabilitiesTools {
                    list_changed: Some(false),
                }),
                ..Default::default()
            },
            protocol_version: negotiate_protocol_version(params).to_string(),
            instructions: None,
            meta: None,
        };

        match serde_json::to_value(initialize_result) {
            Ok(result) => json_rpc_result(id, result),
            Err(_) => json_rpc_error(id, INTERNAL_ERROR_CODE, "Internal error"),
        }
    }
}

#[async_trait]
impl ServerInstance for McpServer {
    async fn handle_request(&self, request: RpcRequest, peer: Peer) -> Result<Value, AppError> {
        if self.is_closed() {
            return Err(AppError::internal("request delivered to a closed server instance"));
        }

        let RpcRequest { id, method, params } = request;
        let audit_params = redact_audit_params(params.as_ref());
        let id = Some(id);

        let response = match method.as_str() {
            "initialize" => self.initialize(id, params.as_ref()),
            "ping" => json_rpc_result(id, json!({})),
            "tools/list" => json_rpc_result(id, json!({ "tools": self.catalog.list() })),
            "tools/call" => {
                handle_tools_call(
                    self.api.as_ref(),
                    &self.credentials,
                    &self.catalog,
                    &peer,
                    id,
                    params,
                )
                .await
            }
            _ => json_rpc_error(id, METHOD_NOT_FOUND_CODE, "Method not found"),
        };

        info!(
            method = %method,
            params = %audit_params,
            outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
            "mcp action audited"
        );

        Ok(response)
    }

    async fn handle_notification(&self, method: &str, _params: Option<Value>) {
        debug!(method, "notification received");
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(username = %self.credentials.username, "server instance closed");
        }
    }
}

/// Echoes the client's version when supported, otherwise answers with the latest.
pub fn negotiate_protocol_version(params: Option<&Value>) -> &'static str {
    let offered = params
        .and_then(Value::as_object)
        .and_then(|object| object.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim);

    offered
        .and_then(|offered| {
            SUPPORTED_PROTOCOL_VERSIONS
                .into_iter()
                .find(|version| *version == offered)
        })
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "api_key" | "apikey" | "username" | "login"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("credential")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::{
        dataforseo_client::UpstreamError,
        domain::{fields::FieldFilter, modules::EnabledModules},
    };

    struct RecordingApi {
        calls: Mutex<Vec<(String, String, Value)>>,
        response: Value,
    }

    #[async_trait]
    impl SeoApi for RecordingApi {
        async fn post(
            &self,
            credentials: &Credentials,
            path: &str,
            body: Value,
        ) -> Result<Value, UpstreamError> {
            self.calls.lock().expect("calls lock").push((
                credentials.username.clone(),
                path.to_string(),
                body,
            ));
            Ok(self.response.clone())
        }
    }

    fn server_with(api: Arc<RecordingApi>) -> McpServer {
        McpServer::new(
            Credentials::new("alice", "secret"),
            api,
            Arc::new(ToolCatalog::new(&EnabledModules::all())),
        )
    }

    fn ok_api() -> Arc<RecordingApi> {
        Arc::new(RecordingApi {
            calls: Mutex::new(Vec::new()),
            response: json!({
                "status_code": 20000,
                "tasks": [{"status_code": 20000, "result": [{"items_count": 3}]}]
            }),
        })
    }

    fn request(id: Value, method: &str, params: Value) -> RpcRequest {
        RpcRequest {
            id,
            method: method.to_string(),
            params: Some(params),
        }
    }

    #[tokio::test]
    async fn tools_call_uses_instance_credentials() {
        let api = ok_api();
        let server = server_with(api.clone());

        let response = server
            .handle_request(
                request(
                    json!("call-1"),
                    "tools/call",
                    json!({"name": "backlinks_summary", "arguments": {"target": "example.com"}}),
                ),
                Peer::detached(),
            )
            .await
            .expect("response");

        assert_eq!(response["id"], "call-1");
        assert_eq!(response["result"]["structuredContent"]["result"][0]["items_count"], 3);

        let calls = api.calls.lock().expect("calls lock");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "alice");
        assert_eq!(calls[0].1, "/v3/backlinks/summary/live");
        assert_eq!(calls[0].2, json!([{"target": "example.com"}]));
    }

    #[tokio::test]
    async fn upstream_failure_becomes_error_result() {
        let api = Arc::new(RecordingApi {
            calls: Mutex::new(Vec::new()),
            response: json!({"status_code": 40100, "status_message": "Not authorized"}),
        });
        let server = server_with(api);

        let response = server
            .handle_request(
                request(
                    json!(5),
                    "tools/call",
                    json!({"name": "backlinks_summary", "arguments": {"target": "example.com"}}),
                ),
                Peer::detached(),
            )
            .await
            .expect("response");

        assert_eq!(response["id"], 5);
        assert_eq!(response["result"]["isError"], true);
        assert!(response["result"]["content"][0]["text"]
            .as_str()
            .expect("text content")
            .contains("Not authorized"));
    }

    #[tokio::test]
    async fn invalid_arguments_are_invalid_params() {
        let api = ok_api();
        let server = server_with(api.clone());

        let response = server
            .handle_request(
                request(json!(3), "tools/call", json!({"name": "backlinks_summary", "arguments": {}})),
                Peer::detached(),
            )
            .await
            .expect("response");

        assert_eq!(response["id"], 3);
        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(response["error"]["data"]["code"], "missing_argument");
        assert_eq!(response["error"]["data"]["message"], "target is required");
        assert!(api.calls.lock().expect("calls lock").is_empty());
    }

    #[tokio::test]
    async fn field_configuration_trims_tool_results() {
        let api = Arc::new(RecordingApi {
            calls: Mutex::new(Vec::new()),
            response: json!({
                "status_code": 20000,
                "tasks": [{
                    "status_code": 20000,
                    "result": [{"target": "example.com", "backlinks": 120, "referring_domains": 14}]
                }]
            }),
        });
        let fields = FieldFilter::from_json(
            r#"{"supported_fields": {"backlinks_summary": ["backlinks"]}}"#,
        )
        .expect("valid configuration");
        let catalog = ToolCatalog::new(&EnabledModules::all()).with_fields(fields);
        let server = McpServer::new(Credentials::new("alice", "secret"), api, Arc::new(catalog));

        let response = server
            .handle_request(
                request(
                    json!(4),
                    "tools/call",
                    json!({"name": "backlinks_summary", "arguments": {"target": "example.com"}}),
                ),
                Peer::detached(),
            )
            .await
            .expect("response");

        assert_eq!(
            response["result"]["structuredContent"]["result"],
            json!([{"backlinks": 120}])
        );
    }

    #[tokio::test]
    async fn progress_token_emits_notifications() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let server = server_with(ok_api());

        server
            .handle_request(
                request(
                    json!(1),
                    "tools/call",
                    json!({
                        "name": "backlinks_summary",
                        "arguments": {"target": "example.com"},
                        "_meta": {"progressToken": 9}
                    }),
                ),
                Peer::new(tx),
            )
            .await
            .expect("response");

        let first = rx.try_recv().expect("start notification");
        let second = rx.try_recv().expect("finish notification");
        assert_eq!(first["params"]["progress"], 0);
        assert_eq!(second["params"]["progress"], 1);
        assert_eq!(second["params"]["progressToken"], 9);
    }

    #[tokio::test]
    async fn unknown_tool_is_method_not_found() {
        let server = server_with(ok_api());

        let response = server
            .handle_request(
                request(json!(2), "tools/call", json!({"name": "nope", "arguments": {}})),
                Peer::detached(),
            )
            .await
            .expect("response");

        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["error"]["data"]["code"], "tool_not_found");
    }

    #[tokio::test]
    async fn closed_instance_rejects_requests() {
        let server = server_with(ok_api());
        server.close();
        server.close();

        let result = server
            .handle_request(request(json!(1), "ping", json!({})), Peer::detached())
            .await;

        assert!(result.is_err());
        assert!(server.is_closed());
    }

    #[test]
    fn negotiates_supported_or_latest_version() {
        assert_eq!(
            negotiate_protocol_version(Some(&json!({"protocolVersion": "2025-03-26"}))),
            "2025-03-26"
        );
        assert_eq!(
            negotiate_protocol_version(Some(&json!({"protocolVersion": "1999-01-01"}))),
            LATEST_PROTOCOL_VERSION
        );
        assert_eq!(negotiate_protocol_version(None), LATEST_PROTOCOL_VERSION);
    }

    #[test]
    fn redacts_sensitive_fields_in_audit_params() {
        let params = json!({
            "name": "backlinks_summary",
            "arguments": {
                "target": "example.com",
                "password": "should-not-appear",
                "nested": {
                    "api_key": "should-not-appear"
                }
            }
        });

        let redacted = redact_audit_params(Some(&params));

        assert_eq!(redacted["name"], json!("backlinks_summary"));
        assert_eq!(redacted["arguments"]["target"], json!("example.com"));
        assert_eq!(redacted["arguments"]["password"], json!("[REDACTED]"));
        assert_eq!(redacted["arguments"]["nested"]["api_key"], json!("[REDACTED]"));
    }
}
