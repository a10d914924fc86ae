//! Decoding of HTTP bodies into JSON-RPC messages

use rust_mcp_sdk::schema::JsonrpcMessage;
use serde_json::Value;

use crate::mcp::rpc::{request_id_to_value, JSONRPC_VERSION};
use crate::{errors::AppError, mcp::server::RpcRequest};

pub const INITIALIZE_METHOD: &str = "initialize";

#[derive(Debug, Clone)]
pub enum InboundMessage {
    Request(RpcRequest),
    Notification {
        method: String,
        params: Option<Value>,
    },
    Response,
}

impl InboundMessage {
    pub fn is_initialize_request(&self) -> bool {
        matches!(self, Self::Request(request) if request.method == INITIALIZE_METHOD)
    }
}

/// One POST body: a single message or a batch.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub messages: Vec<InboundMessage>,
    pub batch: bool,
}

impl Inbound {
    pub fn is_initialization(&self) -> bool {
        self.messages
            .iter()
            .any(InboundMessage::is_initialize_request)
    }
}

/// Parses a POST body. Every message must be a well-formed JSON-RPC 2.0 envelope,
/// and an `initialize` request must travel alone.
pub fn parse_body(body: &[u8]) -> Result<Inbound, AppError> {
    let payload: Value = serde_json::from_slice(body).map_err(|_| AppError::Parse)?;

    let inbound = match payload {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(AppError::invalid_request("Invalid Request: empty batch"));
            }
            Inbound {
                messages: items
                    .into_iter()
                    .map(parse_message)
                    .collect::<Result<Vec<_>, _>>()?,
                batch: true,
            }
        }
        other => Inbound {
            messages: vec![parse_message(other)?],
            batch: false,
        },
    };

    if inbound.is_initialization() && inbound.messages.len() > 1 {
        return Err(AppError::invalid_request(
            "Invalid Request: Only one initialization request is allowed",
        ));
    }

    Ok(inbound)
}

pub fn parse_message(payload: Value) -> Result<InboundMessage, AppError> {
    let invalid = || AppError::invalid_request("Invalid Request");

    if payload.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(invalid());
    }

    let parsed: JsonrpcMessage = serde_json::from_value(payload).map_err(|_| invalid())?;
    match parsed {
        JsonrpcMessage::Request(request) => {
            if request.method.trim().is_empty() {
                return Err(invalid());
            }
            Ok(InboundMessage::Request(RpcRequest {
                id: request_id_to_value(request.id),
                method: request.method,
                params: request.params.map(Value::Object),
            }))
        }
        JsonrpcMessage::Notification(notification) => {
            if notification.method.trim().is_empty() {
                return Err(invalid());
            }
            Ok(InboundMessage::Notification {
                method: notification.method,
                params: notification.params.map(Value::Object),
            })
        }
        JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_) => {
            Ok(InboundMessage::Response)
        }
    }
}
