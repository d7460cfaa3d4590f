//! Assistant provider wire types
//!
//! Only the fields the relay reads are modelled; everything else in the
//! provider payloads is ignored on deserialization.

use super::ProviderError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Thread {
    pub id: String,
}

/// Static definition used when no assistant id is configured
#[derive(Debug, Clone, Serialize)]
pub struct AssistantDefinition {
    pub name: String,
    pub instructions: String,
    pub tools: Vec<FunctionTool>,
    pub model: String,
}

/// Function tool descriptor advertised to the provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionTool {
    pub r#type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl FunctionTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            r#type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// A user message to append to a thread
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewMessage {
    pub content: String,
    /// Uploaded files attached for retrieval search
    pub file_ids: Vec<String>,
}

/// Snapshot of a run carried by lifecycle events
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Run {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl Run {
    /// Tool calls awaiting outputs, empty when nothing is required
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        match &self.required_action {
            Some(action) => &action.submit_tool_outputs.tool_calls,
            None => &[],
        }
    }

    pub fn error_message(&self) -> &str {
        self.last_error
            .as_ref()
            .map_or("Run failed", |e| e.message.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RequiredAction {
    pub submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmitToolOutputs {
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON, not validated by the relay
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

/// Answer to one tool call, matched by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// Incremental message content
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageDelta {
    #[serde(default)]
    pub id: String,
    pub delta: MessageDeltaBody,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub content: Vec<DeltaContent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeltaContent {
    pub r#type: String,
    #[serde(default)]
    pub text: Option<DeltaText>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeltaText {
    #[serde(default)]
    pub value: Option<String>,
}

impl MessageDelta {
    /// Text carried by the delta, concatenated across text parts
    pub fn text(&self) -> String {
        self.delta
            .content
            .iter()
            .filter(|part| part.r#type == "text")
            .filter_map(|part| part.text.as_ref()?.value.as_deref())
            .collect()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            delta: MessageDeltaBody {
                content: vec![DeltaContent {
                    r#type: "text".to_string(),
                    text: Some(DeltaText {
                        value: Some(text.into()),
                    }),
                }],
            },
        }
    }
}

/// One event from a streaming run
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    RunCreated(Run),
    RunQueued(Run),
    RunInProgress(Run),
    RunRequiresAction(Run),
    RunCompleted(Run),
    RunFailed(Run),
    MessageDelta(MessageDelta),
    /// Any kind the relay does not act on
    Other { kind: String },
}

impl RunEvent {
    pub const RUN_CREATED: &'static str = "thread.run.created";
    pub const RUN_QUEUED: &'static str = "thread.run.queued";
    pub const RUN_IN_PROGRESS: &'static str = "thread.run.in_progress";
    pub const RUN_REQUIRES_ACTION: &'static str = "thread.run.requires_action";
    pub const RUN_COMPLETED: &'static str = "thread.run.completed";
    pub const RUN_FAILED: &'static str = "thread.run.failed";
    pub const MESSAGE_DELTA: &'static str = "thread.message.delta";

    /// Decode an event from its kind and JSON payload. Kind matching is
    /// case-sensitive; unrecognised kinds are kept as `Other`.
    pub fn from_parts(kind: &str, data: &str) -> Result<Self, ProviderError> {
        let run = || {
            serde_json::from_str::<Run>(data)
                .map_err(|e| ProviderError::decode(format!("Invalid {kind} payload: {e}")))
        };

        Ok(match kind {
            Self::RUN_CREATED => Self::RunCreated(run()?),
            Self::RUN_QUEUED => Self::RunQueued(run()?),
            Self::RUN_IN_PROGRESS => Self::RunInProgress(run()?),
            Self::RUN_REQUIRES_ACTION => Self::RunRequiresAction(run()?),
            Self::RUN_COMPLETED => Self::RunCompleted(run()?),
            Self::RUN_FAILED => Self::RunFailed(run()?),
            Self::MESSAGE_DELTA => Self::MessageDelta(
                serde_json::from_str(data)
                    .map_err(|e| ProviderError::decode(format!("Invalid {kind} payload: {e}")))?,
            ),
            other => Self::Other {
                kind: other.to_string(),
            },
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::RunCreated(_) => Self::RUN_CREATED,
            Self::RunQueued(_) => Self::RUN_QUEUED,
            Self::RunInProgress(_) => Self::RUN_IN_PROGRESS,
            Self::RunRequiresAction(_) => Self::RUN_REQUIRES_ACTION,
            Self::RunCompleted(_) => Self::RUN_COMPLETED,
            Self::RunFailed(_) => Self::RUN_FAILED,
            Self::MessageDelta(_) => Self::MESSAGE_DELTA,
            Self::Other { kind } => kind,
        }
    }
}
