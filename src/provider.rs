//! Conversation provider abstraction
//!
//! The hosted assistant service owns assistants, threads and runs. The relay
//! only needs the handful of calls below.

mod azure;
mod error;
mod sse;
mod types;

pub use azure::AzureAssistantsClient;
pub use error::ProviderError;
#[allow(unused_imports)] // Public API re-exports
pub use error::ProviderErrorKind;
pub use types::*;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::Instant;

/// Events of one run, in provider order
pub type EventStream = BoxStream<'static, Result<RunEvent, ProviderError>>;

/// Common interface for assistant providers
#[async_trait]
pub trait Provider: Send + Sync {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, ProviderError>;

    async fn create_assistant(
        &self,
        definition: &AssistantDefinition,
    ) -> Result<Assistant, ProviderError>;

    /// Fails with a `NotFound` error when the thread no longer exists
    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, ProviderError>;

    async fn create_thread(&self) -> Result<Thread, ProviderError>;

    async fn create_message(&self, thread_id: &str, message: &NewMessage)
        -> Result<(), ProviderError>;

    /// Start a run and stream its events
    async fn stream_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<EventStream, ProviderError>;

    /// Answer a run's pending tool calls and stream the continuation
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<EventStream, ProviderError>;
}

/// Logging wrapper for providers
pub struct LoggingProvider {
    inner: Arc<dyn Provider>,
}

impl LoggingProvider {
    pub fn new(inner: Arc<dyn Provider>) -> Self {
        Self { inner }
    }
}

fn log_outcome<T>(operation: &str, start: Instant, result: &Result<T, ProviderError>) {
    let duration_ms = start.elapsed().as_millis();
    match result {
        Ok(_) => tracing::info!(operation, %duration_ms, "Provider call completed"),
        Err(e) => tracing::error!(
            operation,
            %duration_ms,
            kind = ?e.kind,
            retryable = e.kind.is_retryable(),
            error = %e.message,
            "Provider call failed"
        ),
    }
}

#[async_trait]
impl Provider for LoggingProvider {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, ProviderError> {
        let start = Instant::now();
        let result = self.inner.retrieve_assistant(assistant_id).await;
        log_outcome("retrieve_assistant", start, &result);
        result
    }

    async fn create_assistant(
        &self,
        definition: &AssistantDefinition,
    ) -> Result<Assistant, ProviderError> {
        let start = Instant::now();
        let result = self.inner.create_assistant(definition).await;
        log_outcome("create_assistant", start, &result);
        result
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, ProviderError> {
        let start = Instant::now();
        let result = self.inner.retrieve_thread(thread_id).await;
        log_outcome("retrieve_thread", start, &result);
        result
    }

    async fn create_thread(&self) -> Result<Thread, ProviderError> {
        let start = Instant::now();
        let result = self.inner.create_thread().await;
        log_outcome("create_thread", start, &result);
        result
    }

    async fn create_message(
        &self,
        thread_id: &str,
        message: &NewMessage,
    ) -> Result<(), ProviderError> {
        let start = Instant::now();
        let result = self.inner.create_message(thread_id, message).await;
        log_outcome("create_message", start, &result);
        result
    }

    async fn stream_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<EventStream, ProviderError> {
        let start = Instant::now();
        let result = self.inner.stream_run(thread_id, assistant_id).await;
        log_outcome("stream_run", start, &result);
        result
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<EventStream, ProviderError> {
        let start = Instant::now();
        let result = self
            .inner
            .submit_tool_outputs(thread_id, run_id, outputs)
            .await;
        log_outcome("submit_tool_outputs", start, &result);
        result
    }
}
