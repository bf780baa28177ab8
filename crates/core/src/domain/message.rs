use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::participant::Participant;

/// A tool invocation requested by the assistant. `arguments` is the raw JSON
/// text emitted by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub tool_call_id: String,
    pub name: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Participant,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_responses: Vec<ToolResponse>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Participant::Human, content.into(), Vec::new(), Vec::new())
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::new(Participant::Assistant, content.into(), tool_calls, Vec::new())
    }

    pub fn executor(tool_responses: Vec<ToolResponse>) -> Self {
        let content = tool_responses
            .iter()
            .map(|response| response.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Self::new(Participant::Executor, content, Vec::new(), tool_responses)
    }

    fn new(
        role: Participant,
        content: String,
        tool_calls: Vec<ToolCall>,
        tool_responses: Vec<ToolResponse>,
    ) -> Self {
        Self { role, content, tool_calls, tool_responses, created_at: Utc::now() }
    }

    pub fn requests_tools(&self) -> bool {
        self.role == Participant::Assistant && !self.tool_calls.is_empty()
    }

    /// Whether the message should be shown to the customer. Executor output and
    /// content-less assistant turns (pure tool requests) stay internal.
    pub fn is_visible(&self) -> bool {
        match self.role {
            Participant::Executor => false,
            Participant::Assistant => !self.content.trim().is_empty(),
            Participant::Human => true,
        }
    }
}
