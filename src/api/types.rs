//! API request and response types

use serde::{Deserialize, Serialize};

/// JSON request body
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Uploaded file ids attached to the message
    #[serde(rename = "fileIds", default)]
    pub file_ids: Vec<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
