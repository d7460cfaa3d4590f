//! Run orchestration
//!
//! Drives one request from assistant resolution to a terminal run event.
//! Tool rounds are handled by looping over [`RelayState`] rather than by
//! recursion, so the number of consecutive rounds is bounded only by the
//! provider.

use super::chunk::OutputChunk;
use super::dispatch::dispatch;
use super::translate::{translate, Signal, Translation};
use crate::provider::{
    AssistantDefinition, EventStream, NewMessage, Provider, ProviderError, ToolCall, ToolOutput,
};
use crate::tools::ToolRegistry;
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Chunks buffered ahead of a slow reader
const CHANNEL_CAPACITY: usize = 32;

const ASSISTANT_NAME: &str = "Financial Tutor";
const ASSISTANT_INSTRUCTIONS: &str = "You are a personal financial advisor assistant. \
Answer questions about stocks, budgeting and investing. Use the available functions to look up \
stock prices and to email a summary when the user asks for one. Keep answers short and concrete.";

/// Which request shape started the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Raw text query: always a fresh thread, no thread marker
    Legacy,
    /// JSON request: may continue a thread and reports the thread it used
    Structured,
}

/// A validated user request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    pub mode: RequestMode,
    pub message: String,
    pub file_ids: Vec<String>,
    /// Thread the caller wants to continue
    pub thread_id: Option<String>,
}

impl RelayRequest {
    pub fn legacy(message: impl Into<String>) -> Self {
        Self {
            mode: RequestMode::Legacy,
            message: message.into(),
            file_ids: Vec::new(),
            thread_id: None,
        }
    }

    pub fn structured(
        message: impl Into<String>,
        file_ids: Vec<String>,
        thread_id: Option<String>,
    ) -> Self {
        Self {
            mode: RequestMode::Structured,
            message: message.into(),
            file_ids,
            thread_id,
        }
    }
}

/// How the assistant is obtained for each request
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    /// Configured assistant; `None` creates one from `definition`
    pub assistant_id: Option<String>,
    pub definition: AssistantDefinition,
}

impl AssistantSettings {
    pub fn new(assistant_id: Option<String>, model: &str, tools: &ToolRegistry) -> Self {
        Self {
            assistant_id,
            definition: AssistantDefinition {
                name: ASSISTANT_NAME.to_string(),
                instructions: ASSISTANT_INSTRUCTIONS.to_string(),
                tools: tools.definitions(),
                model: model.to_string(),
            },
        }
    }
}

#[derive(Debug, Error)]
enum RelayError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("client disconnected")]
    Disconnected,
}

/// Writing end of the outward chunk stream
struct ChunkSink(mpsc::Sender<OutputChunk>);

impl ChunkSink {
    async fn send(&self, chunk: OutputChunk) -> Result<(), RelayError> {
        self.0.send(chunk).await.map_err(|_| RelayError::Disconnected)
    }
}

/// Orchestration states. Each loop iteration performs one step and yields
/// the next state.
enum RelayState {
    ResolvingAssistant,
    PreparingThread {
        assistant_id: String,
        fresh_thread: bool,
    },
    PostingMessage {
        assistant_id: String,
        thread_id: String,
    },
    Streaming {
        thread_id: String,
        events: EventStream,
    },
    RequiresAction {
        thread_id: String,
        run_id: String,
        tool_calls: Vec<ToolCall>,
    },
    Submitting {
        thread_id: String,
        run_id: String,
        outputs: Vec<ToolOutput>,
    },
    Completed,
    Failed,
}

/// Outcome of relaying one event stream
enum StreamEnd {
    Signal(Signal),
    Exhausted,
}

/// Runs requests against the provider; shared by all handlers
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    assistant: AssistantSettings,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        assistant: AssistantSettings,
    ) -> Self {
        Self {
            provider,
            tools,
            assistant,
        }
    }

    /// Start a request in the background and return its chunk stream.
    ///
    /// Dropping the stream stops the request at its next step; no further
    /// provider calls are made after that.
    pub fn stream(self: &Arc<Self>, request: RelayRequest) -> ReceiverStream<OutputChunk> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run(request, ChunkSink(tx)).await;
        });
        ReceiverStream::new(rx)
    }

    async fn run(&self, request: RelayRequest, sink: ChunkSink) {
        match self.drive(&request, &sink).await {
            Ok(()) => tracing::debug!("Relay finished"),
            Err(RelayError::Disconnected) => {
                tracing::info!("Client disconnected, relay stopped");
            }
            Err(RelayError::Provider(e)) => {
                tracing::error!(kind = ?e.kind, error = %e.message, "Relay failed");
                // Best effort: the reader may already be gone
                let _ = sink.send(OutputChunk::Error(e.message)).await;
            }
        }
    }

    async fn drive(&self, request: &RelayRequest, sink: &ChunkSink) -> Result<(), RelayError> {
        let mut state = RelayState::ResolvingAssistant;
        let mut tool_rounds = 0u32;

        loop {
            state = match state {
                RelayState::ResolvingAssistant => {
                    let (assistant_id, fresh_thread) = self.resolve_assistant(request).await?;
                    RelayState::PreparingThread {
                        assistant_id,
                        fresh_thread,
                    }
                }

                RelayState::PreparingThread {
                    assistant_id,
                    fresh_thread,
                } => {
                    let thread_id = self.prepare_thread(request, fresh_thread, sink).await?;
                    RelayState::PostingMessage {
                        assistant_id,
                        thread_id,
                    }
                }

                RelayState::PostingMessage {
                    assistant_id,
                    thread_id,
                } => {
                    let message = NewMessage {
                        content: request.message.clone(),
                        file_ids: request.file_ids.clone(),
                    };
                    self.provider.create_message(&thread_id, &message).await?;
                    let events = self.provider.stream_run(&thread_id, &assistant_id).await?;
                    tracing::info!(%thread_id, %assistant_id, "Run started");
                    RelayState::Streaming { thread_id, events }
                }

                RelayState::Streaming {
                    thread_id,
                    mut events,
                } => match relay_events(&mut events, sink).await? {
                    StreamEnd::Signal(Signal::DispatchRequired { run_id, tool_calls }) => {
                        RelayState::RequiresAction {
                            thread_id,
                            run_id,
                            tool_calls,
                        }
                    }
                    StreamEnd::Signal(Signal::Failed) => RelayState::Failed,
                    StreamEnd::Signal(Signal::Completed) | StreamEnd::Exhausted => {
                        RelayState::Completed
                    }
                },

                RelayState::RequiresAction {
                    thread_id,
                    run_id,
                    tool_calls,
                } => {
                    tool_rounds += 1;
                    tracing::info!(%run_id, calls = tool_calls.len(), round = tool_rounds, "Dispatching tool calls");
                    let outputs = dispatch(&self.tools, &tool_calls).await;
                    RelayState::Submitting {
                        thread_id,
                        run_id,
                        outputs,
                    }
                }

                RelayState::Submitting {
                    thread_id,
                    run_id,
                    outputs,
                } => {
                    if sink.0.is_closed() {
                        return Err(RelayError::Disconnected);
                    }
                    let events = self
                        .provider
                        .submit_tool_outputs(&thread_id, &run_id, &outputs)
                        .await?;
                    RelayState::Streaming { thread_id, events }
                }

                RelayState::Completed => {
                    tracing::info!(tool_rounds, "Run completed");
                    return Ok(());
                }

                RelayState::Failed => {
                    tracing::warn!(tool_rounds, "Run failed");
                    return Ok(());
                }
            };
        }
    }

    /// Returns the assistant id and whether a caller-supplied thread must
    /// be ignored.
    async fn resolve_assistant(&self, request: &RelayRequest) -> Result<(String, bool), RelayError> {
        let Some(assistant_id) = &self.assistant.assistant_id else {
            let assistant = self
                .provider
                .create_assistant(&self.assistant.definition)
                .await?;
            tracing::info!(assistant_id = %assistant.id, "Assistant created");
            return Ok((assistant.id, false));
        };

        match self.provider.retrieve_assistant(assistant_id).await {
            Ok(assistant) => Ok((assistant.id, false)),
            Err(e) if request.mode == RequestMode::Structured => {
                tracing::warn!(%assistant_id, error = %e, "Assistant lookup failed, creating a new assistant and thread");
                let assistant = self
                    .provider
                    .create_assistant(&self.assistant.definition)
                    .await?;
                Ok((assistant.id, true))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reuse the caller's thread when it still exists, otherwise create one.
    /// A newly created thread is announced to structured callers first.
    async fn prepare_thread(
        &self,
        request: &RelayRequest,
        fresh_thread: bool,
        sink: &ChunkSink,
    ) -> Result<String, RelayError> {
        if request.mode == RequestMode::Structured && !fresh_thread {
            if let Some(thread_id) = &request.thread_id {
                match self.provider.retrieve_thread(thread_id).await {
                    Ok(thread) => {
                        tracing::debug!(thread_id = %thread.id, "Continuing thread");
                        return Ok(thread.id);
                    }
                    Err(e) if e.is_not_found() => {
                        tracing::info!(%thread_id, "Thread not found, starting a new one");
                    }
                    Err(e) => {
                        tracing::warn!(%thread_id, error = %e, "Thread lookup failed, starting a new one");
                    }
                }
            }
        }

        let thread = self.provider.create_thread().await?;
        tracing::info!(thread_id = %thread.id, "Thread created");
        if request.mode == RequestMode::Structured {
            sink.send(OutputChunk::Thread(thread.id.clone())).await?;
        }
        Ok(thread.id)
    }
}

/// Relay one event stream until it signals or runs out
async fn relay_events(events: &mut EventStream, sink: &ChunkSink) -> Result<StreamEnd, RelayError> {
    loop {
        let next = tokio::select! {
            biased;
            () = sink.0.closed() => return Err(RelayError::Disconnected),
            next = events.next() => next,
        };

        let Some(event) = next else {
            return Ok(StreamEnd::Exhausted);
        };

        let event = event?;
        tracing::trace!(kind = event.kind(), "Run event");
        let Translation { chunk, signal } = translate(event);
        if let Some(chunk) = chunk {
            sink.send(chunk).await?;
        }
        if let Some(signal) = signal {
            return Ok(StreamEnd::Signal(signal));
        }
    }
}
