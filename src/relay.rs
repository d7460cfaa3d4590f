//! Request relay
//!
//! Turns one user request into a stream of output chunks: resolves the
//! assistant and thread, starts a streaming run, translates provider events
//! and answers tool calls until the run reaches a terminal state.

mod chunk;
mod dispatch;
mod orchestrator;
#[cfg(test)]
pub mod testing;
mod translate;

pub use orchestrator::{AssistantSettings, Orchestrator, RelayRequest, RequestMode};
