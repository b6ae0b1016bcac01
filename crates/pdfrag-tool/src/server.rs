//! Serving half of the tool protocol.
//!
//! A `ToolRegistry` holds named tools with declared parameters; `serve`
//! dispatches newline-delimited JSON-RPC from stdin. An unknown tool name or
//! an argument that does not match the declaration is rejected before the
//! handler runs.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use serde_json::{Map, Value};

use crate::protocol::{
    ContentItem, JsonRpcRequest, JsonRpcResponse, ToolInfo, CODE_INVALID_PARAMS,
    CODE_METHOD_NOT_FOUND, CODE_TOOL_FAILED, PROTOCOL_VERSION,
};

pub type ToolHandler = Box<dyn Fn(&Map<String, Value>) -> anyhow::Result<Vec<ContentItem>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Array,
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind, required: true }
    }

    pub fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind, required: false }
    }

    fn matches(&self, value: &Value) -> bool {
        match self.kind {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_u64() || value.is_i64(),
            ParamKind::Array => value.is_array(),
        }
    }

    fn schema_type(&self) -> &'static str {
        match self.kind {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Array => "array",
        }
    }
}

pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    pub handler: ToolHandler,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, ToolDef>,
    server_name: String,
}

impl ToolRegistry {
    pub fn new(server_name: &str) -> Self {
        Self { tools: HashMap::new(), server_name: server_name.to_string() }
    }

    pub fn register(&mut self, tool: ToolDef) {
        self.tools.insert(tool.name, tool);
    }

    pub fn tool_infos(&self) -> Vec<ToolInfo> {
        let mut infos: Vec<ToolInfo> = self
            .tools
            .values()
            .map(|t| {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for p in &t.params {
                    properties.insert(
                        p.name.to_string(),
                        serde_json::json!({ "type": p.schema_type() }),
                    );
                    if p.required {
                        required.push(Value::String(p.name.to_string()));
                    }
                }
                ToolInfo {
                    name: t.name.to_string(),
                    description: t.description.to_string(),
                    input_schema: serde_json::json!({
                        "type": "object",
                        "properties": properties,
                        "required": required,
                    }),
                }
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Validate and run one tool call. Validation failures never reach the
    /// handler.
    pub fn dispatch(&self, tool_name: &str, arguments: &Map<String, Value>) -> DispatchResult {
        let tool = match self.tools.get(tool_name) {
            Some(tool) => tool,
            None => {
                return DispatchResult::Rejected {
                    code: CODE_METHOD_NOT_FOUND,
                    message: format!("Unknown tool: {tool_name}"),
                }
            }
        };
        for p in &tool.params {
            match arguments.get(p.name) {
                Some(value) => {
                    // null stands in for an omitted optional argument
                    if value.is_null() && !p.required {
                        continue;
                    }
                    if !p.matches(value) {
                        return DispatchResult::Rejected {
                            code: CODE_INVALID_PARAMS,
                            message: format!(
                                "Argument '{}' of tool '{}' must be of type {}",
                                p.name,
                                tool_name,
                                p.schema_type()
                            ),
                        };
                    }
                }
                None if p.required => {
                    return DispatchResult::Rejected {
                        code: CODE_INVALID_PARAMS,
                        message: format!("Missing required argument '{}' for tool '{tool_name}'", p.name),
                    }
                }
                None => {}
            }
        }
        for key in arguments.keys() {
            if !tool.params.iter().any(|p| p.name == key) {
                return DispatchResult::Rejected {
                    code: CODE_INVALID_PARAMS,
                    message: format!("Unknown argument '{key}' for tool '{tool_name}'"),
                };
            }
        }
        match (tool.handler)(arguments) {
            Ok(content) => DispatchResult::Ok(content),
            Err(e) => DispatchResult::Rejected { code: CODE_TOOL_FAILED, message: e.to_string() },
        }
    }

    /// Serve requests from `input` until EOF, writing responses to `output`.
    pub fn serve<R: BufRead, W: Write>(&self, input: R, mut output: W) -> anyhow::Result<()> {
        for line in input.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
                Ok(request) => request,
                Err(_) => continue,
            };
            if let Some(response) = self.handle(request) {
                let encoded = serde_json::to_string(&response)?;
                writeln!(output, "{encoded}")?;
                output.flush()?;
            }
        }
        Ok(())
    }

    fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        match request.method.as_str() {
            "initialize" => Some(JsonRpcResponse::success(
                request.id,
                serde_json::json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": self.server_name,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            )),
            "notifications/initialized" => None,
            "tools/list" => Some(JsonRpcResponse::success(
                request.id,
                serde_json::json!({ "tools": self.tool_infos() }),
            )),
            "tools/call" => {
                let params = request.params.unwrap_or(Value::Null);
                let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
                let empty = Map::new();
                let arguments = params
                    .get("arguments")
                    .and_then(|v| v.as_object())
                    .unwrap_or(&empty);
                let response = match self.dispatch(name, arguments) {
                    DispatchResult::Ok(content) => JsonRpcResponse::success(
                        request.id,
                        serde_json::json!({ "content": content }),
                    ),
                    DispatchResult::Rejected { code, message } => {
                        JsonRpcResponse::failure(request.id, code, message)
                    }
                };
                Some(response)
            }
            other => Some(JsonRpcResponse::failure(
                request.id,
                CODE_METHOD_NOT_FOUND,
                format!("Unknown method: {other}"),
            )),
        }
    }
}

pub enum DispatchResult {
    Ok(Vec<ContentItem>),
    Rejected { code: i64, message: String },
}
