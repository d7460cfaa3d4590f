//! Tools the assistant can call
//!
//! Handlers are looked up by function name. The registry is built once at
//! startup and only read while requests are served.

mod send_email;
mod stock_price;

pub use send_email::SendEmailTool;
pub use stock_price::StockPriceTool;

use crate::config::EmailConfig;
use crate::provider::FunctionTool;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Failure inside a tool handler
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Execution(String),
}

/// Trait for tools that can be executed on behalf of the assistant
#[async_trait]
pub trait Tool: Send + Sync {
    /// Function name the provider calls
    fn name(&self) -> &str;

    /// Tool description for the assistant
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool with already-parsed arguments
    async fn run(&self, input: Value) -> Result<String, ToolError>;
}

/// Collection of tools available to the assistant
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled tools
    pub fn standard(email: &EmailConfig) -> Result<Self, ToolError> {
        let mut registry = Self::new();
        registry.register(Arc::new(StockPriceTool));
        registry.register(Arc::new(SendEmailTool::new(email.clone())?));
        Ok(registry)
    }

    /// Add a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Descriptors advertised to the provider, in registration order
    pub fn definitions(&self) -> Vec<FunctionTool> {
        self.tools
            .iter()
            .map(|t| FunctionTool::new(t.name(), t.description(), t.input_schema()))
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}
