//! Server-Sent Events decoding for streaming runs
//!
//! Turns the raw response body into a stream of [`RunEvent`]s. Frames are
//! split on blank lines; `data: [DONE]` ends the stream.

use super::{EventStream, ProviderError, RunEvent};
use bytes::Bytes;
use futures::{Stream, StreamExt};

/// Upper bound on bytes buffered without a frame delimiter
const MAX_SSE_BUFFER_SIZE: usize = 1024 * 1024;

const DONE_MARKER: &str = "[DONE]";

/// One decoded SSE frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    fn parse(raw: &str) -> Option<Self> {
        let mut event = None;
        let mut data: Vec<&str> = Vec::new();

        for line in raw.lines() {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match field {
                "event" => event = Some(value.to_string()),
                "data" => data.push(value),
                _ => {}
            }
        }

        if event.is_none() && data.is_empty() {
            return None;
        }
        Some(Self {
            event,
            data: data.join("\n"),
        })
    }

    pub fn is_done(&self) -> bool {
        self.data == DONE_MARKER
    }

    pub fn into_event(self) -> Result<RunEvent, ProviderError> {
        let kind = self.event.as_deref().unwrap_or("message");
        RunEvent::from_parts(kind, &self.data)
    }
}

/// Incremental frame splitter
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed bytes, returning every frame completed by them
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseFrame>, ProviderError> {
        // The retained buffer holds no delimiter; only the seam can start one
        let mut from = self.buffer.len().saturating_sub(1);
        self.buffer.extend(chunk.iter().filter(|b| **b != b'\r'));

        let mut frames = Vec::new();
        while let Some(pos) = find_delimiter(&self.buffer, from) {
            let rest = self.buffer.split_off(pos + 2);
            let raw = std::mem::replace(&mut self.buffer, rest);
            if let Some(frame) = Self::decode(&raw)? {
                frames.push(frame);
            }
            from = 0;
        }

        if self.buffer.len() > MAX_SSE_BUFFER_SIZE {
            return Err(ProviderError::decode(format!(
                "SSE frame exceeds {MAX_SSE_BUFFER_SIZE} bytes"
            )));
        }
        Ok(frames)
    }

    /// Flush a trailing frame that was not followed by a blank line
    pub fn finish(&mut self) -> Result<Option<SseFrame>, ProviderError> {
        let raw = std::mem::take(&mut self.buffer);
        Self::decode(&raw)
    }

    fn decode(raw: &[u8]) -> Result<Option<SseFrame>, ProviderError> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| ProviderError::decode(format!("SSE frame is not UTF-8: {e}")))?;
        Ok(SseFrame::parse(text))
    }
}

/// Position of the next blank-line delimiter at or after `from`
fn find_delimiter(buffer: &[u8], from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(2)
        .position(|w| w == b"\n\n")
        .map(|pos| pos + from)
}

/// Decode a response body into run events.
///
/// Ends after `[DONE]`, at end of body, or after the first error item.
pub fn event_stream<S, E>(body: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut decoder = SseDecoder::default();
        futures::pin_mut!(body);

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(ProviderError::network(format!("Stream interrupted: {e}")));
                    return;
                }
            };

            let frames = match decoder.push(&chunk) {
                Ok(frames) => frames,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            for frame in frames {
                if frame.is_done() {
                    return;
                }
                let event = frame.into_event();
                let failed = event.is_err();
                yield event;
                if failed {
                    return;
                }
            }
        }

        match decoder.finish() {
            Ok(Some(frame)) if !frame.is_done() => {
                yield frame.into_event();
            }
            Ok(_) => {}
            Err(e) => {
                yield Err(e);
            }
        }
    })
}
