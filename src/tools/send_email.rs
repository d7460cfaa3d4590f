//! Notification tool backed by an HTTP mail relay

use super::{Tool, ToolError};
use crate::config::EmailConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Sends an email to the configured receiver
pub struct SendEmailTool {
    client: Client,
    config: EmailConfig,
}

#[derive(Debug, Deserialize)]
struct SendEmailInput {
    subject: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl SendEmailTool {
    pub fn new(config: EmailConfig) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ToolError::Execution(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &'static str {
        "sendEmail"
    }

    fn description(&self) -> String {
        "Send an email to the configured recipient with the given subject and body text."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["subject", "text"],
            "properties": {
                "subject": {
                    "type": "string",
                    "description": "Subject line of the email"
                },
                "text": {
                    "type": "string",
                    "description": "Plain text body of the email"
                }
            }
        })
    }

    async fn run(&self, input: Value) -> Result<String, ToolError> {
        let input: SendEmailInput =
            serde_json::from_value(input).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let receiver = self
            .config
            .receiver
            .as_deref()
            .ok_or_else(|| ToolError::Execution("No email receiver configured".to_string()))?;

        if self.config.dry_run {
            tracing::info!(to = %receiver, subject = %input.subject, "Email skipped (dry run)");
            return Ok(format!("Email sent (dry run) to {receiver}"));
        }

        let url = self
            .config
            .sender_url
            .as_deref()
            .ok_or_else(|| ToolError::Execution("No email relay configured".to_string()))?;

        let response = self
            .client
            .post(url)
            .json(&RelayRequest {
                to: receiver,
                subject: &input.subject,
                text: &input.text,
            })
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("Email relay unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Execution(format!(
                "Email relay returned HTTP {status}"
            )));
        }

        tracing::info!(to = %receiver, subject = %input.subject, "Email sent");
        Ok(format!("Email sent to {receiver}"))
    }
}
