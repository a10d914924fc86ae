//! Tools exposed via Model Context Protocol
//!
//! Publishes the enabled part of the catalog and executes `tools/call` by forwarding
//! validated arguments to the upstream API with the instance's own credentials.

use chrono::{SecondsFormat, Utc};
use rust_mcp_sdk::schema::{CallToolRequestParams, CallToolResult, ContentBlock, TextContent};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::dataforseo_client::{extract_task_result, SeoApi};
use crate::domain::catalog::{ParamKind, ParamSpec, ToolDefinition, TOOLS};
use crate::domain::fields::FieldFilter;
use crate::domain::modules::EnabledModules;
use crate::mcp::peer::Peer;
use crate::mcp::rpc::{json_rpc_error, json_rpc_error_with_data, json_rpc_result};
use crate::{
    credentials::Credentials,
    errors::{INTERNAL_ERROR_CODE, INVALID_PARAMS_CODE, METHOD_NOT_FOUND_CODE},
};

/// Arguments that do not match a tool's parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InvalidArgument {
    pub code: &'static str,
    pub message: String,
}

impl InvalidArgument {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn to_json_rpc(&self, id: Option<Value>) -> Value {
        json_rpc_error_with_data(
            id,
            INVALID_PARAMS_CODE,
            "Invalid params",
            Some(json!({
                "code": self.code,
                "message": self.message,
            })),
        )
    }
}

/// The tools available to a deployment.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<&'static ToolDefinition>,
    fields: FieldFilter,
}

impl ToolCatalog {
    pub fn new(enabled: &EnabledModules) -> Self {
        Self::from_tools(
            TOOLS
                .iter()
                .filter(|tool| enabled.contains(tool.module))
                .collect(),
        )
    }

    pub fn from_tools(tools: Vec<&'static ToolDefinition>) -> Self {
        Self {
            tools,
            fields: FieldFilter::default(),
        }
    }

    /// Restricts the fields returned by the tools the filter names.
    pub fn with_fields(mut self, fields: FieldFilter) -> Self {
        for tool in fields.tools() {
            if self.get(tool).is_none() {
                warn!(tool, "field configuration names a tool that is not enabled");
            }
        }
        self.fields = fields;
        self
    }

    pub fn get(&self, name: &str) -> Option<&'static ToolDefinition> {
        self.tools.iter().copied().find(|tool| tool.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn list(&self) -> Value {
        Value::Array(self.tools.iter().map(|tool| tool_descriptor(tool)).collect())
    }
}

pub fn tool_descriptor(tool: &ToolDefinition) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "inputSchema": input_schema(tool.params),
    })
}

pub fn input_schema(params: &[ParamSpec]) -> Value {
    let properties: Map<String, Value> = params
        .iter()
        .map(|param| {
            let mut schema = match param.kind {
                ParamKind::String => json!({"type": "string"}),
                ParamKind::Integer => json!({"type": "integer"}),
                ParamKind::Number => json!({"type": "number"}),
                ParamKind::Boolean => json!({"type": "boolean"}),
                ParamKind::StringArray => json!({"type": "array", "items": {"type": "string"}}),
            };
            schema["description"] = Value::String(param.description.to_string());
            (param.name.to_string(), schema)
        })
        .collect();

    let required: Vec<&str> = params
        .iter()
        .filter(|param| param.required)
        .map(|param| param.name)
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Checks arguments against the tool's parameter list. Unknown keys pass through
/// untouched so newer upstream options stay usable.
pub fn validate_arguments(
    tool: &ToolDefinition,
    arguments: &Map<String, Value>,
) -> Result<(), InvalidArgument> {
    for param in tool.params {
        let Some(value) = arguments.get(param.name).filter(|value| !value.is_null()) else {
            if param.required {
                return Err(InvalidArgument::new(
                    "missing_argument",
                    format!("{} is required", param.name),
                ));
            }
            continue;
        };

        let valid = match param.kind {
            ParamKind::String => value.as_str().is_some_and(|text| !text.trim().is_empty()),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::StringArray => value
                .as_array()
                .is_some_and(|items| !items.is_empty() && items.iter().all(Value::is_string)),
        };

        if !valid {
            return Err(InvalidArgument::new(
                "invalid_argument",
                format!("{} must be {}", param.name, describe_kind(param.kind)),
            ));
        }
    }

    Ok(())
}

fn describe_kind(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::String => "a non-empty string",
        ParamKind::Integer => "an integer",
        ParamKind::Number => "a number",
        ParamKind::Boolean => "a boolean",
        ParamKind::StringArray => "a non-empty array of strings",
    }
}

pub fn progress_token(params: Option<&Value>) -> Option<Value> {
    params
        .and_then(|params| params.get("_meta"))
        .and_then(|meta| meta.get("progressToken"))
        .filter(|token| token.is_string() || token.is_number())
        .cloned()
}

pub async fn handle_tools_call(
    api: &dyn SeoApi,
    credentials: &Credentials,
    catalog: &ToolCatalog,
    peer: &Peer,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let token = progress_token(params.as_ref());
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS_CODE, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS_CODE, "Invalid params"),
    };

    let Some(tool) = catalog.get(&tool_call.name) else {
        return json_rpc_error_with_data(
            id,
            METHOD_NOT_FOUND_CODE,
            "Method not found",
            Some(json!({
                "code": "tool_not_found",
                "message": "unknown tool name",
                "details": {
                    "name": tool_call.name,
                },
            })),
        );
    };

    let arguments = tool_call.arguments.unwrap_or_default();
    if let Err(err) = validate_arguments(tool, &arguments) {
        return err.to_json_rpc(id);
    }

    if let Some(token) = token.as_ref() {
        peer.notify_progress(token, 0, 1, &format!("calling {}", tool.name));
    }

    debug!(tool = tool.name, username = %credentials.username, "forwarding tool call");
    let outcome = api
        .post(credentials, tool.endpoint, Value::Array(vec![Value::Object(arguments)]))
        .await
        .and_then(|payload| extract_task_result(&payload));

    if let Some(token) = token.as_ref() {
        peer.notify_progress(token, 1, 1, &format!("{} finished", tool.name));
    }

    let result = match outcome {
        Ok(data) => success_result(tool, catalog.fields.apply(tool.name, data)),
        Err(err) => {
            debug!(tool = tool.name, error = %err, "upstream call failed");
            error_result(&err.message)
        }
    };

    match serde_json::to_value(result) {
        Ok(value) => json_rpc_result(id, value),
        Err(_) => json_rpc_error(id, INTERNAL_ERROR_CODE, "Internal error"),
    }
}

fn success_result(tool: &ToolDefinition, data: Value) -> CallToolResult {
    let text = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());
    let generated_at_utc = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text, None, None))],
        is_error: None,
        meta: None,
        structured_content: Some(Map::from_iter([
            ("tool".to_string(), json!(tool.name)),
            ("result".to_string(), data),
            ("generated_at_utc".to_string(), json!(generated_at_utc)),
        ])),
    }
}

fn error_result(message: &str) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(
            format!("Error: {message}"),
            None,
            None,
        ))],
        is_error: Some(true),
        meta: None,
        structured_content: None,
    }
}
