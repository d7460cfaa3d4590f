//! Units of the outward text stream

use bytes::Bytes;
use std::fmt;

/// Run lifecycle markers relayed to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Created,
    Queued,
    InProgress,
}

impl RunStatus {
    pub fn sentinel(self) -> &'static str {
        match self {
            Self::Created => "@created",
            Self::Queued => "@queued",
            Self::InProgress => "@in_progress",
        }
    }
}

/// One piece of the response body.
///
/// Rendered as plain text; control chunks use the sentinel vocabulary
/// `@created`, `@queued`, `@in_progress`, `@thread:<id>` and `Error: <message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChunk {
    Status(RunStatus),
    /// Thread the caller should send back to continue the conversation
    Thread(String),
    /// Assistant content, verbatim
    Text(String),
    Error(String),
}

impl fmt::Display for OutputChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => f.write_str(status.sentinel()),
            Self::Thread(id) => write!(f, "@thread:{id}"),
            Self::Text(text) => f.write_str(text),
            Self::Error(message) => write!(f, "Error: {message}"),
        }
    }
}

impl From<OutputChunk> for Bytes {
    fn from(chunk: OutputChunk) -> Self {
        match chunk {
            OutputChunk::Text(text) => Bytes::from(text),
            other => Bytes::from(other.to_string()),
        }
    }
}
