//! JSON-RPC envelope construction and error mapping
//!
//! Every envelope produced here echoes the caller's `id`, or `null` when the request
//! could not be parsed or authenticated.

use rust_mcp_sdk::schema::RequestId;
use serde_json::{json, Value};

pub const JSONRPC_VERSION: &str = "2.0";

pub fn is_json_rpc_error(value: &Value) -> bool {
    value.get("error").is_some()
}

pub fn json_rpc_error(id: Option<Value>, code: i32, message: &str) -> Value {
    json_rpc_error_with_data(id, code, message, None)
}

pub fn json_rpc_error_with_data(
    id: Option<Value>,
    code: i32,
    message: &str,
    data: Option<Value>,
) -> Value {
    let mut error = json!({
        "code": code,
        "message": message,
    });
    if let Some(data) = data {
        error["data"] = data;
    }

    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id.unwrap_or(Value::Null),
        "error": error
    })
}

pub fn json_rpc_result(id: Option<Value>, result: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id.unwrap_or(Value::Null),
        "result": result
    })
}

pub fn json_rpc_notification(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": method,
        "params": params
    })
}

pub fn request_id_to_value(id: RequestId) -> Value {
    match id {
        RequestId::String(value) => Value::String(value),
        RequestId::Integer(value) => Value::Number(value.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_without_id_serializes_null_id() {
        let envelope = json_rpc_error(None, -32001, "Invalid credentials");

        assert_eq!(envelope["jsonrpc"], "2.0");
        assert!(envelope["id"].is_null());
        assert_eq!(envelope["error"]["code"], -32001);
        assert_eq!(envelope["error"]["message"], "Invalid credentials");
        assert!(envelope["error"].get("data").is_none());
    }

    #[test]
    fn result_echoes_string_id() {
        let envelope = json_rpc_result(Some(json!("1")), json!({"tools": []}));

        assert_eq!(envelope["id"], "1");
        assert_eq!(envelope["result"]["tools"], json!([]));
        assert!(!is_json_rpc_error(&envelope));
    }

    #[test]
    fn request_id_round_trips_to_value() {
        assert_eq!(
            request_id_to_value(RequestId::String("abc".to_string())),
            json!("abc")
        );
        assert_eq!(request_id_to_value(RequestId::Integer(42)), json!(42));
    }
}
