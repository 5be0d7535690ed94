//! Tool registry and execution
//!
//! The catalog is built once at startup as an explicit `name -> handler`
//! table; there is no runtime reflection, and "tool not found" is a plain
//! lookup miss. Every tool-level failure (unknown tool, invalid arguments,
//! handler error) comes back as a successful call result with
//! `isError: true` so the calling agent can tell a malformed request apart
//! from an operation that could not complete.


pub mod builtin;

use crate::cache::ResponseCache;
use crate::cancel::CancelHandle;
use crate::outbound::ExternalCallClient;
use crate::protocol::{CallToolResult, Resource, Tool, ToolContent};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Everything a running tool may borrow from the server: its cancellation
/// handle, the inbound bearer token (pass-through only), the response cache
/// with the configured default time-to-live, and the outbound call client.
pub struct ToolContext<'a> {
    pub cancel: Option<CancelHandle>,
    pub bearer: Option<&'a str>,
    pub cache: &'a ResponseCache,
    pub cache_ttl: Duration,
    pub outbound: &'a ExternalCallClient,
}

/// What a tool hands back on success: a human-readable text block and,
/// when the result is non-trivial, the same data untransformed for machine
/// consumers.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub text: String,
    pub structured: Option<Value>,
}

impl ToolOutput {
    #[inline]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structured: None,
        }
    }

    #[inline]
    pub fn structured(text: impl Into<String>, structured: Value) -> Self {
        Self {
            text: text.into(),
            structured: Some(structured),
        }
    }
}

/// Tool handler trait for implementing tool execution
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(
        &self,
        arguments: &Map<String, Value>,
        ctx: &ToolContext<'_>,
    ) -> Result<ToolOutput>;
}

struct RegisteredTool {
    descriptor: Tool,
    schema: JSONSchema,
    handler: Arc<dyn ToolHandler>,
}

/// Catalog of invocable tools, immutable after startup.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. The descriptor's input schema is compiled here so a
    /// bad schema fails at startup, not on the first call.
    #[inline]
    pub fn register(&mut self, descriptor: Tool, handler: Arc<dyn ToolHandler>) -> Result<()> {
        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&descriptor.input_schema)
            .map_err(|e| {
                anyhow!(
                    "Failed to compile input schema for tool '{}': {}",
                    descriptor.name,
                    e
                )
            })?;

        debug!("Registered tool: {}", descriptor.name);
        self.tools.insert(
            descriptor.name.clone(),
            RegisteredTool {
                descriptor,
                schema,
                handler,
            },
        );
        Ok(())
    }

    /// Registry with the built-in tools.
    #[inline]
    pub fn create_default() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(
            builtin::EchoHandler::tool_definition(),
            Arc::new(builtin::EchoHandler),
        )?;
        registry.register(
            builtin::CountdownHandler::tool_definition(),
            Arc::new(builtin::CountdownHandler),
        )?;
        Ok(registry)
    }

    /// The full static catalog, sorted by name so repeated `tools/list`
    /// calls return identical arrays.
    #[inline]
    pub fn descriptors(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self
            .tools
            .values()
            .map(|registered| registered.descriptor.clone())
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Resource descriptors for tools that carry a `ui://` panel.
    #[inline]
    pub fn ui_resources(&self) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self
            .tools
            .values()
            .filter_map(|registered| {
                registered.descriptor.ui_resource_uri.as_ref().map(|uri| Resource {
                    uri: uri.clone(),
                    name: registered.descriptor.name.clone(),
                    description: registered.descriptor.description.clone(),
                    mime_type: Some("text/html".to_string()),
                })
            })
            .collect();
        resources.sort_by(|a, b| a.uri.cmp(&b.uri));
        resources
    }

    /// Catalog keys are case-sensitive, but call-time lookup matches
    /// case-insensitively. Exact match wins; otherwise scan (the catalog is
    /// small and static).
    fn lookup(&self, name: &str) -> Option<&RegisteredTool> {
        if let Some(registered) = self.tools.get(name) {
            return Some(registered);
        }
        self.tools
            .values()
            .find(|registered| registered.descriptor.name.eq_ignore_ascii_case(name))
    }

    /// Invoke a tool by name with uniform error wrapping.
    ///
    /// Arguments are validated against the tool's declared input schema
    /// before the handler runs, so malformed calls are rejected uniformly
    /// instead of per-tool.
    #[inline]
    pub async fn execute(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        ctx: &ToolContext<'_>,
    ) -> CallToolResult {
        let Some(registered) = self.lookup(name) else {
            debug!("Call for unknown tool '{name}'");
            return tool_failure(format!("Unknown tool: {name}"));
        };

        let args_value = Value::Object(arguments.clone());
        if let Err(errors) = registered.schema.validate(&args_value) {
            let messages: Vec<String> = errors
                .map(|e| format!("{}: {}", e.instance_path, e))
                .collect();
            debug!("Invalid arguments for tool '{name}': {}", messages.join(", "));
            return tool_failure(format!(
                "Invalid arguments for tool '{}': {}",
                registered.descriptor.name,
                messages.join(", ")
            ));
        }

        match registered.handler.handle(&arguments, ctx).await {
            Ok(output) => CallToolResult {
                content: vec![ToolContent::Text { text: output.text }],
                is_error: false,
                structured_content: output.structured,
            },
            Err(e) => {
                error!("Tool '{name}' failed during execution: {e}");
                tool_failure(format!(
                    "Tool '{}' failed: {e}",
                    registered.descriptor.name
                ))
            }
        }
    }
}

/// A tool-level failure: a successful envelope whose result explains what
/// went wrong. Never a JSON-RPC error object.
fn tool_failure(message: String) -> CallToolResult {
    CallToolResult {
        content: vec![ToolContent::Text { text: message }],
        is_error: true,
        structured_content: None,
    }
}
