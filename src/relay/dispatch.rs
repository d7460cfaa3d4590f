//! Tool call fan-out
//!
//! Every pending call is answered exactly once, in the order the provider
//! listed them, whatever order the handlers finish in.

use crate::provider::{ToolCall, ToolOutput};
use crate::tools::ToolRegistry;
use futures::future;
use serde_json::Value;
use std::time::Instant;

/// Output for calls naming a tool that is not registered
pub const UNKNOWN_FUNCTION: &str = "Unknown function";

/// Run all calls concurrently and collect one output per call.
///
/// Each handler runs in its own task, so a slow, failing or panicking
/// handler cannot hold back or abort its siblings.
pub async fn dispatch(registry: &ToolRegistry, calls: &[ToolCall]) -> Vec<ToolOutput> {
    let tasks = calls.iter().map(|call| {
        let tool = registry.lookup(&call.function.name);
        let call = call.clone();
        tokio::spawn(async move {
            let output = match tool {
                Some(tool) => invoke(tool.as_ref(), &call).await,
                None => {
                    tracing::warn!(tool = %call.function.name, call_id = %call.id, "Unknown tool requested");
                    UNKNOWN_FUNCTION.to_string()
                }
            };
            ToolOutput {
                tool_call_id: call.id,
                output,
            }
        })
    });

    let joined = future::join_all(tasks).await;

    joined
        .into_iter()
        .zip(calls)
        .map(|(result, call)| {
            result.unwrap_or_else(|e| {
                tracing::error!(tool = %call.function.name, call_id = %call.id, error = %e, "Tool task aborted");
                ToolOutput {
                    tool_call_id: call.id.clone(),
                    output: format!("Error: tool {} did not complete", call.function.name),
                }
            })
        })
        .collect()
}

async fn invoke(tool: &dyn crate::tools::Tool, call: &ToolCall) -> String {
    let input: Value = match serde_json::from_str(&call.function.arguments) {
        Ok(input) => input,
        Err(e) => {
            tracing::warn!(tool = %call.function.name, call_id = %call.id, error = %e, "Malformed tool arguments");
            return format!("Error: Invalid arguments: {e}");
        }
    };

    let start = Instant::now();
    let result = tool.run(input).await;
    let duration_ms = start.elapsed().as_millis();

    match result {
        Ok(output) => {
            tracing::info!(tool = %call.function.name, call_id = %call.id, %duration_ms, "Tool completed");
            output
        }
        Err(e) => {
            tracing::warn!(tool = %call.function.name, call_id = %call.id, %duration_ms, error = %e, "Tool failed");
            format!("Error: {e}")
        }
    }
}
