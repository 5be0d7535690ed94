//! Built-in tools
//!
//! Small tools that exercise the dispatch engine end to end: `echo` for a
//! minimal request/response round trip and `countdown` for a long-running
//! loop that cooperates with cancellation.

use crate::protocol::{Tool, ToolAnnotations};
use crate::tools::{ToolContext, ToolHandler, ToolOutput};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::time::Duration;

/// Echoes the caller's message back.
pub struct EchoHandler;

impl EchoHandler {
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "echo".to_string(),
            description: Some("Echo a message back to the caller".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "Message to echo"
                    }
                },
                "required": ["message"],
                "additionalProperties": false
            }),
            annotations: Some(ToolAnnotations {
                read_only_hint: Some(true),
                idempotent_hint: Some(true),
                open_world_hint: Some(false),
            }),
            ui_resource_uri: None,
        }
    }
}

#[async_trait]
impl ToolHandler for EchoHandler {
    #[inline]
    async fn handle(
        &self,
        arguments: &Map<String, Value>,
        _ctx: &ToolContext<'_>,
    ) -> Result<ToolOutput> {
        let message = arguments
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Missing required parameter: message"))?;

        Ok(ToolOutput::structured(
            format!("Echo: {message}"),
            json!({"message": message}),
        ))
    }
}

/// Counts down one tick at a time, polling its cancellation handle between
/// ticks. On observing cancellation it returns a well-formed partial result
/// instead of erroring.
pub struct CountdownHandler;

/// Tick length for the countdown loop.
const TICK: Duration = Duration::from_millis(100);

impl CountdownHandler {
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "countdown".to_string(),
            description: Some(
                "Count down a number of ticks, stopping early if cancelled".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ticks": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 600,
                        "description": "Number of ticks to count down (default: 5)"
                    }
                },
                "additionalProperties": false
            }),
            annotations: Some(ToolAnnotations {
                read_only_hint: Some(true),
                idempotent_hint: Some(false),
                open_world_hint: Some(false),
            }),
            ui_resource_uri: None,
        }
    }
}

#[async_trait]
impl ToolHandler for CountdownHandler {
    #[inline]
    async fn handle(
        &self,
        arguments: &Map<String, Value>,
        ctx: &ToolContext<'_>,
    ) -> Result<ToolOutput> {
        let ticks = arguments
            .get("ticks")
            .and_then(Value::as_i64)
            .unwrap_or(5)
            .max(1) as u64;

        for completed in 0..ticks {
            let cancelled = ctx
                .cancel
                .as_ref()
                .is_some_and(crate::cancel::CancelHandle::is_cancelled);
            if cancelled {
                let partial = json!({"status": "cancelled", "progress": completed});
                return Ok(ToolOutput::structured(partial.to_string(), partial));
            }
            tokio::time::sleep(TICK).await;
        }

        let done = json!({"status": "complete", "progress": ticks});
        Ok(ToolOutput::structured(done.to_string(), done))
    }
}
