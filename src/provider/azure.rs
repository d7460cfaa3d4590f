//! Azure `OpenAI` Assistants client

use super::sse::event_stream;
use super::types::{Assistant, AssistantDefinition, NewMessage, Thread, ToolOutput};
use super::{EventStream, Provider, ProviderError, ProviderErrorKind};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Assistants REST client authenticated with an `api-key` header
pub struct AzureAssistantsClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    api_version: String,
}

impl AzureAssistantsClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        // No overall timeout: run streams stay open for as long as the run lasts
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::unknown(format!("Failed to create HTTP client: {e}")))?;

        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            ProviderError::new(
                ProviderErrorKind::InvalidRequest,
                format!("Invalid endpoint {}: {e}", config.endpoint),
            )
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(ProviderError::new(
                ProviderErrorKind::InvalidRequest,
                format!("Endpoint {endpoint} cannot carry a path"),
            ));
        }

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
        })
    }

    /// `{endpoint}/openai/{segments..}?api-version=..`, each segment
    /// percent-encoded on its own
    fn url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::unknown("Endpoint cannot carry a path"))?
            .pop_if_empty()
            .push("openai")
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = request
            .header("api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    ProviderError::network(format!("Connection failed: {e}"))
                } else {
                    ProviderError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("Failed to read response: {e}")))?;
        let message = serde_json::from_str::<AzureErrorResponse>(&body)
            .map_or(body, |resp| resp.error.message);
        Err(ProviderError::from_status(status.as_u16(), &message))
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("Failed to read response: {e}")))?;
        serde_json::from_str(&body).map_err(|e| {
            ProviderError::decode(format!("Failed to parse response: {e} - body: {body}"))
        })
    }
}

#[async_trait]
impl Provider for AzureAssistantsClient {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, ProviderError> {
        let url = self.url(&["assistants", resource_id(assistant_id)?])?;
        Self::json(self.send(self.client.get(url)).await?).await
    }

    async fn create_assistant(
        &self,
        definition: &AssistantDefinition,
    ) -> Result<Assistant, ProviderError> {
        let request = self.client.post(self.url(&["assistants"])?).json(definition);
        Self::json(self.send(request).await?).await
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, ProviderError> {
        let url = self.url(&["threads", resource_id(thread_id)?])?;
        Self::json(self.send(self.client.get(url)).await?).await
    }

    async fn create_thread(&self) -> Result<Thread, ProviderError> {
        let request = self
            .client
            .post(self.url(&["threads"])?)
            .json(&serde_json::json!({}));
        Self::json(self.send(request).await?).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        message: &NewMessage,
    ) -> Result<(), ProviderError> {
        let body = CreateMessageRequest::from(message);
        let request = self
            .client
            .post(self.url(&["threads", resource_id(thread_id)?, "messages"])?)
            .json(&body);
        self.send(request).await?;
        Ok(())
    }

    async fn stream_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<EventStream, ProviderError> {
        let body = CreateRunRequest {
            assistant_id,
            stream: true,
        };
        let request = self
            .client
            .post(self.url(&["threads", resource_id(thread_id)?, "runs"])?)
            .json(&body);
        let response = self.send(request).await?;
        Ok(event_stream(response.bytes_stream()))
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<EventStream, ProviderError> {
        let body = SubmitToolOutputsRequest {
            tool_outputs: outputs,
            stream: true,
        };
        let request = self
            .client
            .post(self.url(&[
                "threads",
                resource_id(thread_id)?,
                "runs",
                resource_id(run_id)?,
                "submit_tool_outputs",
            ])?)
            .json(&body);
        let response = self.send(request).await?;
        Ok(event_stream(response.bytes_stream()))
    }
}

/// Provider ids are opaque `[A-Za-z0-9_-]+` tokens. Anything else is
/// rejected before it reaches a request path.
fn resource_id(id: &str) -> Result<&str, ProviderError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(id)
    } else {
        Err(ProviderError::new(
            ProviderErrorKind::InvalidRequest,
            format!("Invalid resource id {id:?}"),
        ))
    }
}

// Azure API types

#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<MessageAttachment<'a>>,
}

impl<'a> From<&'a NewMessage> for CreateMessageRequest<'a> {
    fn from(message: &'a NewMessage) -> Self {
        Self {
            role: "user",
            content: &message.content,
            attachments: message
                .file_ids
                .iter()
                .map(|file_id| MessageAttachment {
                    file_id,
                    tools: vec![AttachmentTool {
                        r#type: "file_search",
                    }],
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessageAttachment<'a> {
    file_id: &'a str,
    tools: Vec<AttachmentTool>,
}

#[derive(Debug, Serialize)]
struct AttachmentTool {
    r#type: &'static str,
}

#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct SubmitToolOutputsRequest<'a> {
    tool_outputs: &'a [ToolOutput],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct AzureErrorResponse {
    error: AzureError,
}

#[derive(Debug, Deserialize)]
struct AzureError {
    message: String,
}
