//! Request dispatch and batch processing
//!
//! One parsed JSON-RPC object in, one response envelope out; arrays fan out
//! through the same method table per element and reassemble in source order.
//! Anything that escapes a handler is converted to `-32603` with a bounded
//! diagnostic at the outer guard; nothing propagates to the transport raw.


use crate::protocol::{
    CallToolParams, InitializeResult, JsonRpcError, LogLevel, MCP_VERSION, RequestId,
    error_envelope, success_envelope, truncate_diagnostic,
};
use crate::server::ServerContext;
use crate::tools::ToolContext;
use anyhow::Error as AnyError;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-exchange metadata carried from the transport: the inbound bearer
/// token, if any, passed through to outbound calls unmodified.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub bearer: Option<String>,
}

/// Routes parsed JSON-RPC messages through the server context.
pub struct Dispatcher {
    ctx: Arc<ServerContext>,
}

impl Dispatcher {
    #[inline]
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self { ctx }
    }

    /// Entry point for one raw transport exchange. Returns the serialized
    /// response body, or `None` when no response is owed (notifications,
    /// or a blank body, which this stateless single-exchange protocol
    /// treats as the `initialized` acknowledgment).
    #[inline]
    pub async fn handle_raw(&self, raw: &str, meta: &RequestMeta) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            debug!("Blank body treated as initialized acknowledgment");
            return None;
        }

        let value: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(e) => {
                debug!("Failed to parse request body: {e}");
                return Some(error_envelope(None, &JsonRpcError::parse_error()).to_string());
            }
        };

        self.handle_value(value, meta).await.map(|v| v.to_string())
    }

    /// Dispatch one parsed JSON value: an array takes the batch path, an
    /// object the single path, anything else is an invalid request.
    #[inline]
    pub async fn handle_value(&self, value: Value, meta: &RequestMeta) -> Option<Value> {
        match value {
            Value::Array(elements) => self.handle_batch(elements, meta).await,
            Value::Object(obj) => self.handle_object(obj, meta).await,
            _ => Some(error_envelope(None, &JsonRpcError::invalid_request())),
        }
    }

    /// Process a batch. Responses keep the relative order of their source
    /// elements; notifications are dispatched for side effects and omitted.
    /// An empty batch is itself an invalid request, answered with a single
    /// error envelope rather than an array.
    async fn handle_batch(&self, elements: Vec<Value>, meta: &RequestMeta) -> Option<Value> {
        if elements.is_empty() {
            return Some(error_envelope(None, &JsonRpcError::invalid_request()));
        }

        let mut responses = Vec::new();
        for element in elements {
            match element {
                Value::Object(obj) => {
                    if let Some(response) = self.handle_object(obj, meta).await {
                        responses.push(response);
                    }
                }
                _ => responses.push(error_envelope(None, &JsonRpcError::invalid_request())),
            }
        }

        // A batch of nothing but notifications owes the client no reply.
        if responses.is_empty() {
            None
        } else {
            Some(Value::Array(responses))
        }
    }

    /// Dispatch one request object. A missing or null id marks a
    /// notification: the method still runs for its side effects, but no
    /// envelope is ever produced for it.
    async fn handle_object(
        &self,
        obj: Map<String, Value>,
        meta: &RequestMeta,
    ) -> Option<Value> {
        let id = match parse_id(obj.get("id")) {
            Ok(id) => id,
            Err(()) => {
                return Some(error_envelope(None, &JsonRpcError::invalid_request()));
            }
        };

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            return id
                .as_ref()
                .map(|id| error_envelope(Some(id), &JsonRpcError::invalid_request()));
        };

        let params = obj.get("params").cloned();
        let outcome = self.route(method, params, id.as_ref(), meta).await;

        let id = id?;
        Some(match outcome {
            Ok(result) => success_envelope(&id, result),
            Err(error) => error_envelope(Some(&id), &error),
        })
    }

    /// The method table, shared by the single and batch paths.
    async fn route(
        &self,
        method: &str,
        params: Option<Value>,
        id: Option<&RequestId>,
        meta: &RequestMeta,
    ) -> Result<Value, JsonRpcError> {
        debug!("Dispatching method '{method}'");
        match method {
            "initialize" => self.handle_initialize(params),
            "initialized" | "notifications/initialized" => Ok(json!({})),
            "notifications/cancelled" => Ok(self.handle_cancelled(params)),
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(params, id, meta).await,
            "resources/list" => Ok(json!({
                "resources": self.ctx.registry().ui_resources(),
            })),
            "resources/templates/list" => Ok(json!({"resourceTemplates": []})),
            "resources/read" => self.handle_read_resource(params).await,
            "prompts/list" => Ok(json!({"prompts": []})),
            "prompts/get" => Err(JsonRpcError::invalid_params(Some(format!(
                "Unknown prompt: {}",
                param_str(params.as_ref(), "name").unwrap_or_default()
            )))),
            "completion/complete" => Ok(json!({
                "completion": {"values": [], "total": 0, "hasMore": false},
            })),
            "logging/setLevel" => self.handle_set_level(params),
            _ => {
                debug!("Unknown method '{method}'");
                Err(JsonRpcError::method_not_found(method))
            }
        }
    }

    /// `initialize` echoes the client's requested protocol version (or the
    /// server default) alongside the fixed capabilities and identity.
    fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let protocol_version = param_str(params.as_ref(), "protocolVersion")
            .unwrap_or(MCP_VERSION)
            .to_string();

        let result = InitializeResult {
            protocol_version,
            capabilities: self.ctx.capabilities(),
            server_info: self.ctx.server_info().clone(),
            instructions: self.ctx.instructions().map(str::to_string),
        };

        serde_json::to_value(result).map_err(internal)
    }

    /// `tools/list` returns the full static catalog. A `cursor` parameter is
    /// accepted but ignored; the catalog is small and never paginated.
    fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        Ok(json!({"tools": self.ctx.registry().descriptors()}))
    }

    /// `tools/call`: a structurally broken request (no params, no name) is a
    /// protocol-level `-32602`; everything past that point, including an
    /// unknown tool name, is a tool-level failure inside a success envelope.
    async fn handle_call_tool(
        &self,
        params: Option<Value>,
        id: Option<&RequestId>,
        meta: &RequestMeta,
    ) -> Result<Value, JsonRpcError> {
        let params = params.ok_or_else(|| {
            JsonRpcError::invalid_params(Some("tools/call requires params".to_string()))
        })?;
        let params: CallToolParams = serde_json::from_value(params)
            .map_err(|e| JsonRpcError::invalid_params(Some(e.to_string())))?;

        let arguments = params.arguments.unwrap_or_default();

        // The call is cancellable only when the client gave it an id to
        // cancel by.
        let cancel = id.map(|id| self.ctx.cancellations().register(id));

        let tool_ctx = ToolContext {
            cancel,
            bearer: meta.bearer.as_deref(),
            cache: self.ctx.cache(),
            cache_ttl: self.ctx.cache_ttl(),
            outbound: self.ctx.outbound(),
        };
        let result = self
            .ctx
            .registry()
            .execute(&params.name, arguments, &tool_ctx)
            .await;

        if let Some(id) = id {
            self.ctx.cancellations().unregister(id);
        }

        serde_json::to_value(result).map_err(internal)
    }

    /// `notifications/cancelled` is side-effect only and idempotent: the
    /// tracker result is logged, never surfaced.
    fn handle_cancelled(&self, params: Option<Value>) -> Value {
        let request_id = params
            .as_ref()
            .and_then(|p| p.get("requestId"))
            .cloned()
            .and_then(|v| serde_json::from_value::<RequestId>(v).ok());

        match request_id {
            Some(request_id) => {
                let found = self.ctx.cancellations().cancel(&request_id);
                debug!("Cancellation for {request_id}: found={found}");
            }
            None => warn!("notifications/cancelled without a usable requestId"),
        }
        json!({})
    }

    async fn handle_read_resource(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let Some(uri) = param_str(params.as_ref(), "uri") else {
            return Err(JsonRpcError::invalid_params(Some(
                "resources/read requires a uri".to_string(),
            )));
        };

        let resolved = self
            .ctx
            .resolver()
            .resolve(uri)
            .await
            .map_err(internal)?;

        match resolved {
            Some(contents) => Ok(json!({"contents": [contents]})),
            None => Err(JsonRpcError::invalid_params(Some(format!(
                "Unknown resource: {uri}"
            )))),
        }
    }

    /// `logging/setLevel` validates against the fixed severity list and
    /// updates the server-wide level.
    fn handle_set_level(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let Some(level) = param_str(params.as_ref(), "level") else {
            return Err(JsonRpcError::invalid_params(Some(
                "logging/setLevel requires a level".to_string(),
            )));
        };

        let parsed: LogLevel = level.parse().map_err(|()| {
            JsonRpcError::invalid_params(Some(format!("Unknown log level: {level}")))
        })?;

        self.ctx.set_log_level(parsed);
        debug!("Log level set to {parsed}");
        Ok(json!({}))
    }
}

/// Extract the request id, preserving its wire type. Absent and null both
/// mark a notification; any other non-string, non-integer id is malformed.
fn parse_id(id: Option<&Value>) -> Result<Option<RequestId>, ()> {
    match id {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(RequestId::String(s.clone()))),
        Some(Value::Number(n)) => n.as_i64().map(|i| Some(RequestId::Number(i))).ok_or(()),
        Some(_) => Err(()),
    }
}

fn param_str<'a>(params: Option<&'a Value>, key: &str) -> Option<&'a str> {
    params.and_then(|p| p.get(key)).and_then(Value::as_str)
}

/// The outer guard's conversion: an escaped error becomes `-32603` with a
/// truncated diagnostic.
fn internal(error: impl Into<AnyError>) -> JsonRpcError {
    let error = error.into();
    JsonRpcError::internal_error(Some(truncate_diagnostic(&error.to_string())))
}
