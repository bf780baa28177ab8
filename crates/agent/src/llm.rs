use std::time::Duration;

use async_trait::async_trait;
use printchat_core::config::{LlmConfig, LlmProvider};
use printchat_core::domain::message::{Message, ToolCall};
use printchat_core::domain::participant::Participant;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::tools::ToolDefinition;

/// Upper bound, in characters, on the error body kept in `LlmError::Status`.
const STATUS_BODY_EXCERPT_CHARS: usize = 512;

pub struct CompletionRequest<'a> {
    pub system_prompt: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [ToolDefinition],
}

/// One assistant turn as produced by the model.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssistantReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), tool_calls: Vec::new() }
    }

    pub fn into_message(self) -> Message {
        Message::assistant(self.content, self.tool_calls)
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm transport failure: {0}")]
    Transport(String),
    #[error("llm returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
    #[error("llm response contained no choices")]
    EmptyChoices,
    #[error("llm client could not be built: {0}")]
    Client(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<AssistantReply, LlmError>;
}

/// Chat-completions client for OpenAI and OpenAI-compatible endpoints (Ollama).
pub struct OpenAiCompatibleClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| LlmError::Client(error.to_string()))?;
        Ok(Self { client, base_url: base_url.into(), model: model.into(), api_key })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        // Ollama ignores the key; never send one it was not given.
        let api_key = match config.provider {
            LlmProvider::OpenAi => config.api_key.clone(),
            LlmProvider::Ollama => config.api_key.clone().filter(|key| !key.expose_secret().is_empty()),
        };
        Self::new(
            config.effective_base_url().to_string(),
            config.model.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, request: &CompletionRequest<'_>) -> Value {
        let mut messages = vec![json!({ "role": "system", "content": request.system_prompt })];
        for message in request.messages {
            messages.extend(wire_messages(message));
        }

        let mut body = json!({ "model": self.model, "messages": messages });
        if !request.tools.is_empty() {
            body["tools"] = Value::Array(
                request
                    .tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": tool.name,
                                "description": tool.description,
                                "parameters": tool.parameters,
                            }
                        })
                    })
                    .collect(),
            );
        }
        body
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(STATUS_BODY_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<AssistantReply, LlmError> {
        let body = self.request_body(&request);
        debug!(
            event_name = "agent.llm.request",
            model = %self.model,
            history_len = request.messages.len(),
            tool_count = request.tools.len(),
            "requesting completion"
        );

        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await.map_err(|error| LlmError::Transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body: excerpt(&body) });
        }

        let decoded = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|error| LlmError::Decode(error.to_string()))?;
        let choice = decoded.choices.into_iter().next().ok_or(LlmError::EmptyChoices)?;

        Ok(AssistantReply {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: choice
                .message
                .tool_calls
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect(),
        })
    }
}

fn wire_messages(message: &Message) -> Vec<Value> {
    match message.role {
        Participant::Human => vec![json!({ "role": "user", "content": message.content })],
        Participant::Assistant => {
            let mut wire = json!({ "role": "assistant", "content": message.content });
            if !message.tool_calls.is_empty() {
                wire["tool_calls"] = Value::Array(
                    message
                        .tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": { "name": call.name, "arguments": call.arguments }
                            })
                        })
                        .collect(),
                );
            }
            vec![wire]
        }
        Participant::Executor => message
            .tool_responses
            .iter()
            .map(|response| {
                json!({
                    "role": "tool",
                    "tool_call_id": response.tool_call_id,
                    "content": response.content,
                })
            })
            .collect(),
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize, Serialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize, Serialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}
