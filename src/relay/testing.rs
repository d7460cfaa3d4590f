//! Test doubles for the relay
//!
//! A scripted provider with queued run streams plus a few tools with
//! controllable latency and failure modes.

use crate::provider::{
    Assistant, AssistantDefinition, EventStream, FunctionCall, NewMessage, Provider,
    ProviderError, Thread, ToolCall, ToolOutput,
};
use crate::tools::{Tool, ToolError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Events
// ============================================================================

/// Builders for provider run events
pub mod events {
    use crate::provider::{
        MessageDelta, RequiredAction, Run, RunError, RunEvent, SubmitToolOutputs,
    };

    fn run(id: &str) -> Run {
        Run {
            id: id.to_string(),
            thread_id: String::new(),
            status: None,
            required_action: None,
            last_error: None,
        }
    }

    pub fn created(run_id: &str) -> RunEvent {
        RunEvent::RunCreated(run(run_id))
    }

    pub fn queued(run_id: &str) -> RunEvent {
        RunEvent::RunQueued(run(run_id))
    }

    pub fn in_progress(run_id: &str) -> RunEvent {
        RunEvent::RunInProgress(run(run_id))
    }

    pub fn completed(run_id: &str) -> RunEvent {
        RunEvent::RunCompleted(run(run_id))
    }

    pub fn failed(run_id: &str, message: &str) -> RunEvent {
        RunEvent::RunFailed(Run {
            last_error: Some(RunError {
                code: None,
                message: message.to_string(),
            }),
            ..run(run_id)
        })
    }

    pub fn delta(text: &str) -> RunEvent {
        RunEvent::MessageDelta(MessageDelta::from_text(text))
    }

    /// `calls` are `(call_id, function_name, arguments)`
    pub fn requires_action(run_id: &str, calls: &[(&str, &str, &str)]) -> RunEvent {
        RunEvent::RunRequiresAction(Run {
            required_action: Some(RequiredAction {
                submit_tool_outputs: SubmitToolOutputs {
                    tool_calls: calls
                        .iter()
                        .map(|(id, name, args)| super::tool_call(id, name, args))
                        .collect(),
                },
            }),
            ..run(run_id)
        })
    }
}

pub fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

// ============================================================================
// Tools
// ============================================================================

/// Sleeps, then answers. Echoes `name:input` unless a fixed output is set.
pub struct SlowTool {
    name: String,
    delay: Duration,
    output: Option<String>,
    invocations: Arc<AtomicUsize>,
}

impl SlowTool {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
            output: None,
            invocations: Arc::default(),
        }
    }

    pub fn fixed(name: impl Into<String>, delay: Duration, output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Self::new(name, delay)
        }
    }

    /// Counts runs that have started, shared with the tool
    pub fn invocations(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.invocations)
    }
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Test tool {}", self.name)
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({ "type": "object" })
    }

    async fn run(&self, input: Value) -> Result<String, ToolError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self
            .output
            .clone()
            .unwrap_or_else(|| format!("{}:{input}", self.name)))
    }
}

pub struct FailingTool {
    name: String,
    message: String,
}

impl FailingTool {
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        "Always fails".to_string()
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({ "type": "object" })
    }

    async fn run(&self, _input: Value) -> Result<String, ToolError> {
        Err(ToolError::Execution(self.message.clone()))
    }
}

/// Panics inside its task, registered as `panics`
pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "panics"
    }

    fn description(&self) -> String {
        "Always panics".to_string()
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({ "type": "object" })
    }

    async fn run(&self, _input: Value) -> Result<String, ToolError> {
        panic!("tool handler panicked");
    }
}

// ============================================================================
// Provider
// ============================================================================

/// A provider call as seen by [`ScriptedProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    RetrieveAssistant(String),
    CreateAssistant {
        name: String,
        tools: Vec<String>,
    },
    RetrieveThread(String),
    CreateThread,
    CreateMessage {
        thread_id: String,
        message: NewMessage,
    },
    StreamRun {
        thread_id: String,
        assistant_id: String,
    },
    SubmitToolOutputs {
        thread_id: String,
        run_id: String,
        outputs: Vec<ToolOutput>,
    },
}

/// Provider that serves queued run streams and records every call.
///
/// Unknown assistants and threads fail with `NotFound`. Created ones get
/// ids `asst_new_N` and `thread_new_N`. Each `stream_run` or
/// `submit_tool_outputs` call takes the next queued stream.
#[derive(Default)]
pub struct ScriptedProvider {
    assistants: HashSet<String>,
    threads: HashSet<String>,
    failures: HashMap<&'static str, ProviderError>,
    streams: Mutex<VecDeque<EventStream>>,
    calls: Mutex<Vec<ProviderCall>>,
    created: Mutex<(u32, u32)>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assistant(mut self, id: &str) -> Self {
        self.assistants.insert(id.to_string());
        self
    }

    pub fn with_thread(mut self, id: &str) -> Self {
        self.threads.insert(id.to_string());
        self
    }

    /// Queue a run stream that yields `events` and then ends
    pub fn with_run(self, events: Vec<crate::provider::RunEvent>) -> Self {
        self.with_stream(stream::iter(events.into_iter().map(Ok)).boxed())
    }

    pub fn with_stream(self, stream: EventStream) -> Self {
        self.streams.lock().unwrap().push_back(stream);
        self
    }

    /// Make the named trait method fail with `error`
    pub fn failing(mut self, operation: &'static str, error: ProviderError) -> Self {
        self.failures.insert(operation, error);
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    /// `(run_id, outputs)` for every submission, in order
    pub fn submissions(&self) -> Vec<(String, Vec<ToolOutput>)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                ProviderCall::SubmitToolOutputs {
                    run_id, outputs, ..
                } => Some((run_id.clone(), outputs.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&self, operation: &'static str, call: ProviderCall) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(call);
        match self.failures.get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn next_stream(&self) -> Result<EventStream, ProviderError> {
        self.streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::network("No scripted stream queued"))
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, ProviderError> {
        self.record(
            "retrieve_assistant",
            ProviderCall::RetrieveAssistant(assistant_id.to_string()),
        )?;
        if self.assistants.contains(assistant_id) {
            Ok(Assistant {
                id: assistant_id.to_string(),
                name: None,
            })
        } else {
            Err(ProviderError::not_found(format!(
                "No assistant found with id '{assistant_id}'."
            )))
        }
    }

    async fn create_assistant(
        &self,
        definition: &AssistantDefinition,
    ) -> Result<Assistant, ProviderError> {
        self.record(
            "create_assistant",
            ProviderCall::CreateAssistant {
                name: definition.name.clone(),
                tools: definition
                    .tools
                    .iter()
                    .map(|t| t.function.name.clone())
                    .collect(),
            },
        )?;
        let mut created = self.created.lock().unwrap();
        created.0 += 1;
        Ok(Assistant {
            id: format!("asst_new_{}", created.0),
            name: Some(definition.name.clone()),
        })
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, ProviderError> {
        self.record(
            "retrieve_thread",
            ProviderCall::RetrieveThread(thread_id.to_string()),
        )?;
        if self.threads.contains(thread_id) {
            Ok(Thread {
                id: thread_id.to_string(),
            })
        } else {
            Err(ProviderError::not_found(format!(
                "No thread found with id '{thread_id}'."
            )))
        }
    }

    async fn create_thread(&self) -> Result<Thread, ProviderError> {
        self.record("create_thread", ProviderCall::CreateThread)?;
        let mut created = self.created.lock().unwrap();
        created.1 += 1;
        Ok(Thread {
            id: format!("thread_new_{}", created.1),
        })
    }

    async fn create_message(
        &self,
        thread_id: &str,
        message: &NewMessage,
    ) -> Result<(), ProviderError> {
        self.record(
            "create_message",
            ProviderCall::CreateMessage {
                thread_id: thread_id.to_string(),
                message: message.clone(),
            },
        )
    }

    async fn stream_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<EventStream, ProviderError> {
        self.record(
            "stream_run",
            ProviderCall::StreamRun {
                thread_id: thread_id.to_string(),
                assistant_id: assistant_id.to_string(),
            },
        )?;
        self.next_stream()
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<EventStream, ProviderError> {
        self.record(
            "submit_tool_outputs",
            ProviderCall::SubmitToolOutputs {
                thread_id: thread_id.to_string(),
                run_id: run_id.to_string(),
                outputs: outputs.to_vec(),
            },
        )?;
        self.next_stream()
    }
}
