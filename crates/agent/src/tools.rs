use std::collections::BTreeMap;

use async_trait::async_trait;
use printchat_core::domain::message::{ToolCall, ToolResponse};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

/// What the model sees for one callable tool. `parameters` is a JSON Schema
/// object.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Unexpected error: {0}")]
    Serialization(String),
}

impl ToolError {
    pub fn into_payload(self) -> Value {
        json!({ "error": self.to_string() })
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;
    async fn execute(&self, arguments: Value) -> Result<Value, ToolError>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.definition().name, Box::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// Runs one requested call. Never fails: every problem becomes an
    /// `{"error": ...}` payload in the response content.
    pub async fn execute(&self, call: &ToolCall) -> ToolResponse {
        let payload = match self.dispatch(call).await {
            Ok(payload) => payload,
            Err(tool_error) => {
                warn!(
                    event_name = "agent.tool.rejected",
                    tool = %call.name,
                    tool_call_id = %call.id,
                    error = %tool_error,
                    "tool call rejected"
                );
                tool_error.into_payload()
            }
        };

        ToolResponse {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: payload.to_string(),
        }
    }

    async fn dispatch(&self, call: &ToolCall) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(call.name.as_str())
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;
        let arguments = parse_arguments(&call.arguments)?;

        info!(
            event_name = "agent.tool.invoked",
            tool = %call.name,
            tool_call_id = %call.id,
            "executing tool call"
        );
        tool.execute(arguments).await
    }
}

fn parse_arguments(raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|error| ToolError::InvalidArguments(error.to_string()))
}

/// Decodes tool arguments into a typed struct.
pub fn decode_arguments<T>(arguments: Value) -> Result<T, ToolError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(arguments).map_err(|error| ToolError::InvalidArguments(error.to_string()))
}
