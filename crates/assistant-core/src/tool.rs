//! Tool System
//!
//! Tools are text-in/text-out capabilities (paper search, web search).
//! The registry is built once at startup and keeps registration order,
//! which is also the order the tools are described to the model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Tool call request parsed from model output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Query text handed to the tool
    pub input: String,

    /// Call ID for tracking
    #[serde(default)]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            id: Some(uuid::Uuid::new_v4().to_string()),
        }
    }
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call ID (if provided in request)
    pub id: Option<String>,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (tool text or error description)
    pub output: String,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: false,
            output: error.into(),
        }
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    /// Text fed back to the model as the observation
    pub fn observation(&self) -> String {
        if self.success {
            format!("Observation ({}): {}", self.name, self.output)
        } else {
            format!("Observation ({} failed): {}", self.name, self.output)
        }
    }
}

/// Tool trait - implement to add new capabilities
///
/// `invoke` may block on an external service. Errors are returned as-is;
/// the agent turns them into observations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name the model uses to address it
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// Run the tool on a query
    async fn invoke(&self, query: &str) -> Result<String>;
}

/// Ordered registry of available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool; names must be unique
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_shared(Arc::new(tool))
    }

    /// Register an already shared tool
    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        if self.get(tool.name()).is_some() {
            return Err(AgentError::DuplicateTool(tool.name().to_string()));
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Execute a tool call
    pub async fn invoke(&self, call: &ToolCall) -> Result<ToolResult> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::UnknownTool(call.name.clone()))?;

        let output = tool.invoke(&call.input).await?;
        Ok(ToolResult::success(tool.name(), output).with_id(call.id.clone()))
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Generate system prompt section describing available tools
    pub fn generate_prompt_section(&self) -> String {
        let mut prompt = String::from("## Available Tools\n\n");
        prompt.push_str("To use a tool, respond with a JSON block and nothing after it:\n\n");
        prompt.push_str("```tool\n{\"tool\": \"tool_name\", \"input\": \"search query\"}\n```\n\n");

        for tool in &self.tools {
            prompt.push_str(&format!("### {}\n{}\n\n", tool.name(), tool.description()));
        }

        prompt.push_str(&format!("Valid tool names: {}\n", self.names().join(", ")));
        prompt
    }
}
