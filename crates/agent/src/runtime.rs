//! Conversation loop for one chat session.
//!
//! A human message starts a run: the turn selector hands the floor to the
//! assistant, the executor runs any requested tools, and control returns to the
//! human once the assistant answers without tool calls.

use std::sync::Arc;

use async_trait::async_trait;
use printchat_core::conversation::{ConversationError, ConversationState};
use printchat_core::domain::message::Message;
use printchat_core::domain::participant::Participant;
use printchat_core::errors::{ApplicationError, DomainError};
use printchat_core::turn::next_speaker;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::llm::{AssistantReply, CompletionRequest, LlmClient, LlmError};
use crate::tools::{ToolDefinition, ToolRegistry};

/// Receives every message appended to a session, in order.
#[async_trait]
pub trait ConversationObserver: Send + Sync {
    async fn on_message(&self, message: &Message);
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Conversation(#[from] ConversationError),
}

impl RuntimeError {
    pub fn into_application(self) -> ApplicationError {
        match self {
            Self::Llm(error) => ApplicationError::Integration(error.to_string()),
            Self::Conversation(error) => ApplicationError::Domain(DomainError::Conversation(error)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    AwaitingHuman,
    RoundLimitReached { max_rounds: usize },
}

/// Shared, immutable pieces every session is built from.
#[derive(Clone)]
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    tool_definitions: Arc<[ToolDefinition]>,
    system_prompt: Arc<str>,
    max_rounds: usize,
}

impl AgentRuntime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        system_prompt: impl Into<Arc<str>>,
        max_rounds: usize,
    ) -> Self {
        let tool_definitions = tools.definitions().into();
        Self { llm, tools, tool_definitions, system_prompt: system_prompt.into(), max_rounds }
    }

    pub fn session(
        &self,
        id: impl Into<String>,
        observers: Vec<Arc<dyn ConversationObserver>>,
    ) -> ChatSession {
        ChatSession {
            id: id.into(),
            runtime: self.clone(),
            state: ConversationState::new(self.max_rounds),
            last_speaker: Participant::Human,
            observers,
            finished: false,
        }
    }
}

pub struct ChatSession {
    id: String,
    runtime: AgentRuntime,
    state: ConversationState,
    last_speaker: Participant,
    observers: Vec<Arc<dyn ConversationObserver>>,
    finished: bool,
}

impl ChatSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[Message] {
        self.state.messages()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Appends the human message and runs the assistant/executor loop until the
    /// floor returns to the human or the round cap is hit.
    ///
    /// An LLM failure aborts the run but keeps the transcript; the next human
    /// message resumes from it.
    pub async fn handle_human_message(&mut self, text: &str) -> Result<TurnOutcome, RuntimeError> {
        if self.finished {
            return Ok(self.round_limit());
        }

        if !self.record(Message::human(text)).await {
            return Ok(self.round_limit());
        }
        self.last_speaker = Participant::Human;

        loop {
            match next_speaker(self.last_speaker, self.state.messages()) {
                Participant::Human => return Ok(TurnOutcome::AwaitingHuman),
                Participant::Assistant => {
                    let reply = self.complete().await?;
                    if !self.record(reply.into_message()).await {
                        return Ok(self.round_limit());
                    }
                    self.last_speaker = Participant::Assistant;
                }
                Participant::Executor => {
                    let message = self.execute_tool_calls().await;
                    if !self.record(message).await {
                        return Ok(self.round_limit());
                    }
                    self.last_speaker = Participant::Executor;
                }
            }
        }
    }

    async fn complete(&self) -> Result<AssistantReply, RuntimeError> {
        let request = CompletionRequest {
            system_prompt: &self.runtime.system_prompt,
            messages: self.state.messages(),
            tools: &self.runtime.tool_definitions,
        };
        self.runtime.llm.complete(request).await.map_err(|llm_error| {
            error!(
                event_name = "agent.llm.failed",
                correlation_id = %self.id,
                error = %llm_error,
                "assistant completion failed"
            );
            RuntimeError::from(llm_error)
        })
    }

    async fn execute_tool_calls(&self) -> Message {
        let calls = self.state.last().map(|message| message.tool_calls.clone()).unwrap_or_default();

        let mut responses = Vec::with_capacity(calls.len());
        for call in &calls {
            responses.push(self.runtime.tools.execute(call).await);
        }
        info!(
            event_name = "agent.executor.completed",
            correlation_id = %self.id,
            tool_calls = calls.len(),
            "executor ran requested tools"
        );
        Message::executor(responses)
    }

    // Returns false once the round cap refuses the message.
    async fn record(&mut self, message: Message) -> bool {
        match self.state.append(message) {
            Ok(appended) => {
                for observer in &self.observers {
                    observer.on_message(appended).await;
                }
                true
            }
            Err(ConversationError::RoundLimitReached { max_rounds }) => {
                warn!(
                    event_name = "agent.session.round_limit",
                    correlation_id = %self.id,
                    max_rounds,
                    "session reached its round cap"
                );
                self.finished = true;
                false
            }
        }
    }

    fn round_limit(&self) -> TurnOutcome {
        TurnOutcome::RoundLimitReached { max_rounds: self.state.max_rounds() }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use printchat_core::domain::message::{Message, ToolCall};
    use printchat_core::domain::participant::Participant;
    use serde_json::{json, Value};

    use super::{AgentRuntime, ConversationObserver, RuntimeError, TurnOutcome};
    use crate::llm::{AssistantReply, CompletionRequest, LlmClient, LlmError};
    use crate::tools::{Tool, ToolDefinition, ToolError, ToolRegistry};

    struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<AssistantReply, LlmError>>>,
        seen_history: Mutex<Vec<usize>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<AssistantReply, LlmError>>) -> Arc<Self> {
            Arc::new(Self { replies: Mutex::new(replies.into()), seen_history: Mutex::default() })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, request: CompletionRequest<'_>) -> Result<AssistantReply, LlmError> {
            self.seen_history.lock().expect("history lock").push(request.messages.len());
            self.replies
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or_else(|| Ok(AssistantReply::text("(script exhausted)")))
        }
    }

    struct CategoryTool;

    #[async_trait]
    impl Tool for CategoryTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "filter_products_by_category",
                description: "test",
                parameters: json!({"type": "object"}),
            }
        }

        async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
            Ok(json!([{"category": arguments["category_name"], "reference": "flyer_a5"}]))
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        seen: Mutex<Vec<(Participant, String)>>,
    }

    #[async_trait]
    impl ConversationObserver for RecordingObserver {
        async fn on_message(&self, message: &Message) {
            self.seen.lock().expect("observer lock").push((message.role, message.content.clone()));
        }
    }

    fn tool_request(id: &str) -> AssistantReply {
        AssistantReply {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: id.to_string(),
                name: "filter_products_by_category".to_string(),
                arguments: r#"{"category_name":"Flyer"}"#.to_string(),
            }],
        }
    }

    fn runtime(llm: Arc<ScriptedLlm>, max_rounds: usize) -> AgentRuntime {
        let mut tools = ToolRegistry::new();
        tools.register(CategoryTool);
        AgentRuntime::new(llm, Arc::new(tools), "system prompt", max_rounds)
    }

    #[tokio::test]
    async fn plain_reply_returns_floor_to_human() {
        let llm = ScriptedLlm::new(vec![Ok(AssistantReply::text("Which category?"))]);
        let mut session = runtime(llm, 40).session("conn-1", Vec::new());

        let outcome = session.handle_human_message("hello").await.expect("run");

        assert_eq!(outcome, TurnOutcome::AwaitingHuman);
        assert_eq!(session.id(), "conn-1");
        let roles = session.messages().iter().map(|message| message.role).collect::<Vec<_>>();
        assert_eq!(roles, vec![Participant::Human, Participant::Assistant]);
    }

    #[tokio::test]
    async fn tool_request_runs_executor_then_assistant_again() {
        let llm = ScriptedLlm::new(vec![
            Ok(tool_request("call_1")),
            Ok(AssistantReply::text("We have an A5 flyer.")),
        ]);
        let observer = Arc::new(RecordingObserver::default());
        let mut session = runtime(llm.clone(), 40).session("conn-2", vec![observer.clone() as Arc<dyn ConversationObserver>]);

        let outcome = session.handle_human_message("flyers please").await.expect("run");

        assert_eq!(outcome, TurnOutcome::AwaitingHuman);
        let roles = session.messages().iter().map(|message| message.role).collect::<Vec<_>>();
        assert_eq!(
            roles,
            vec![Participant::Human, Participant::Assistant, Participant::Executor, Participant::Assistant]
        );

        let executor = &session.messages()[2];
        assert_eq!(executor.tool_responses.len(), 1);
        assert_eq!(executor.tool_responses[0].tool_call_id, "call_1");
        assert!(executor.content.contains("flyer_a5"));

        let seen = observer.seen.lock().expect("observer lock");
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[3], (Participant::Assistant, "We have an A5 flyer.".to_string()));
        assert_eq!(*llm.seen_history.lock().expect("history lock"), vec![1, 3]);
    }

    #[tokio::test]
    async fn round_cap_stops_the_loop_and_finishes_session() {
        let llm = ScriptedLlm::new(vec![Ok(tool_request("call_1")), Ok(tool_request("call_2"))]);
        let mut session = runtime(llm, 3).session("conn-3", Vec::new());

        let outcome = session.handle_human_message("loop forever").await.expect("run");

        assert_eq!(outcome, TurnOutcome::RoundLimitReached { max_rounds: 3 });
        assert_eq!(session.messages().len(), 3);
        assert!(session.is_finished());

        let again = session.handle_human_message("still there?").await.expect("run");
        assert_eq!(again, TurnOutcome::RoundLimitReached { max_rounds: 3 });
        assert_eq!(session.messages().len(), 3);
    }

    #[tokio::test]
    async fn llm_failure_keeps_transcript_and_next_message_resumes() {
        let llm = ScriptedLlm::new(vec![
            Err(LlmError::Transport("connection reset".to_string())),
            Ok(AssistantReply::text("Back again.")),
        ]);
        let mut session = runtime(llm, 40).session("conn-4", Vec::new());

        let error = session.handle_human_message("hi").await.expect_err("llm failure surfaces");
        assert!(matches!(error, RuntimeError::Llm(LlmError::Transport(_))));
        assert_eq!(session.messages().len(), 1);

        let outcome = session.handle_human_message("hi again").await.expect("run");
        assert_eq!(outcome, TurnOutcome::AwaitingHuman);
        assert_eq!(session.messages().len(), 3);
        assert!(!session.is_finished());
    }

    #[test]
    fn runtime_errors_map_to_application_errors() {
        let integration =
            RuntimeError::Llm(LlmError::EmptyChoices).into_application().into_interface("conn-5");
        assert_eq!(
            integration.user_message(),
            "The assistant is temporarily unavailable. Please retry shortly."
        );
    }
}
