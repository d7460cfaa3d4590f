//! Provider event translation
//!
//! Stateless: each event maps to at most one output chunk and an optional
//! control signal, independent of the events before it.

use super::chunk::{OutputChunk, RunStatus};
use crate::provider::{RunEvent, ToolCall};

/// Control transition raised by an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// The run is waiting for these tool calls to be answered
    DispatchRequired {
        run_id: String,
        tool_calls: Vec<ToolCall>,
    },
    Completed,
    Failed,
}

/// Result of translating one event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Translation {
    pub chunk: Option<OutputChunk>,
    pub signal: Option<Signal>,
}

impl Translation {
    fn chunk(chunk: OutputChunk) -> Self {
        Self {
            chunk: Some(chunk),
            signal: None,
        }
    }

    fn signal(signal: Signal) -> Self {
        Self {
            chunk: None,
            signal: Some(signal),
        }
    }
}

pub fn translate(event: RunEvent) -> Translation {
    match event {
        RunEvent::RunCreated(_) => Translation::chunk(OutputChunk::Status(RunStatus::Created)),
        RunEvent::RunQueued(_) => Translation::chunk(OutputChunk::Status(RunStatus::Queued)),
        RunEvent::RunInProgress(_) => {
            Translation::chunk(OutputChunk::Status(RunStatus::InProgress))
        }
        RunEvent::MessageDelta(delta) => {
            let text = delta.text();
            if text.is_empty() {
                Translation::default()
            } else {
                Translation::chunk(OutputChunk::Text(text))
            }
        }
        RunEvent::RunFailed(run) => Translation {
            chunk: Some(OutputChunk::Error(run.error_message().to_string())),
            signal: Some(Signal::Failed),
        },
        RunEvent::RunCompleted(_) => Translation::signal(Signal::Completed),
        RunEvent::RunRequiresAction(run) => {
            let tool_calls = run.pending_tool_calls().to_vec();
            Translation::signal(Signal::DispatchRequired {
                run_id: run.id,
                tool_calls,
            })
        }
        RunEvent::Other { kind } => {
            tracing::trace!(%kind, "Ignoring provider event");
            Translation::default()
        }
    }
}
