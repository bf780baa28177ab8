//! WebSocket chat transport and per-connection sessions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use printchat_agent::runtime::{AgentRuntime, ChatSession, ConversationObserver, TurnOutcome};
use printchat_core::conversation::ConversationError;
use printchat_core::domain::message::Message;
use printchat_core::errors::{ApplicationError, DomainError, InterfaceError};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::routes::AppState;

pub const SYSTEM_SENDER: &str = "system";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    UserMessage(UserMessagePayload),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserMessagePayload {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    Message { sender: String, content: String },
}

impl OutboundEvent {
    pub fn message(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Message { sender: sender.into(), content: content.into() }
    }

    pub fn system(error: &InterfaceError) -> Self {
        Self::message(SYSTEM_SENDER, error.user_message())
    }
}

/// Forwards the customer-visible part of a session to one socket.
pub struct SocketObserver {
    outbound: mpsc::UnboundedSender<OutboundEvent>,
}

impl SocketObserver {
    pub fn new(outbound: mpsc::UnboundedSender<OutboundEvent>) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl ConversationObserver for SocketObserver {
    async fn on_message(&self, message: &Message) {
        if !message.is_visible() {
            return;
        }
        // A closed channel means the socket is gone; the session is dropped
        // with it.
        let _ = self.outbound.send(OutboundEvent::message(message.role.name(), message.content.clone()));
    }
}

pub struct SessionRegistry {
    runtime: AgentRuntime,
    sessions: RwLock<HashMap<ConnectionId, Arc<Mutex<ChatSession>>>>,
}

impl SessionRegistry {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime, sessions: RwLock::new(HashMap::new()) }
    }

    /// Returns the connection's session, creating it with `observer` on first
    /// use.
    pub async fn session_for(
        &self,
        connection_id: ConnectionId,
        observer: Arc<dyn ConversationObserver>,
    ) -> Arc<Mutex<ChatSession>> {
        if let Some(session) = self.sessions.read().await.get(&connection_id) {
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(connection_id)
            .or_insert_with(|| {
                info!(
                    event_name = "server.chat.session_created",
                    connection_id = %connection_id,
                    "chat session created"
                );
                Arc::new(Mutex::new(self.runtime.session(connection_id.to_string(), vec![observer])))
            })
            .clone()
    }

    pub async fn remove(&self, connection_id: ConnectionId) -> bool {
        self.sessions.write().await.remove(&connection_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

pub async fn websocket(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.sessions))
}

async fn handle_socket(socket: WebSocket, sessions: Arc<SessionRegistry>) {
    let connection_id = ConnectionId::new();
    let (mut sender, mut receiver) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<OutboundEvent>();

    info!(event_name = "server.chat.connected", connection_id = %connection_id, "websocket connected");

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(serialize_error) => {
                    error!(
                        event_name = "server.chat.serialize_failed",
                        error = %serialize_error,
                        "could not serialize outbound event"
                    );
                    continue;
                }
            };
            if sender.send(WsMessage::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => {
                handle_frame(&sessions, connection_id, text.as_str(), &outbound).await;
            }
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(receive_error) => {
                warn!(
                    event_name = "server.chat.receive_failed",
                    connection_id = %connection_id,
                    error = %receive_error,
                    "websocket receive failed"
                );
                break;
            }
        }
    }

    sessions.remove(connection_id).await;
    writer.abort();
    info!(event_name = "server.chat.disconnected", connection_id = %connection_id, "websocket closed");
}

fn parse_user_message(frame: &str) -> Option<String> {
    match serde_json::from_str::<InboundEvent>(frame) {
        Ok(InboundEvent::UserMessage(payload)) => {
            payload.message.filter(|message| !message.is_empty())
        }
        Err(_) => None,
    }
}

/// Processes one inbound text frame. Everything the customer should see is
/// pushed onto `outbound`; nothing here closes the connection.
pub async fn handle_frame(
    sessions: &SessionRegistry,
    connection_id: ConnectionId,
    frame: &str,
    outbound: &mpsc::UnboundedSender<OutboundEvent>,
) {
    let Some(text) = parse_user_message(frame) else {
        let correlation_id = connection_id.to_string();
        let rejection = ApplicationError::from(DomainError::InvariantViolation(
            "inbound frame carried no message".to_string(),
        ))
        .into_interface(&correlation_id);
        warn!(
            event_name = "server.chat.empty_message",
            correlation_id = %correlation_id,
            "rejected frame without a message"
        );
        let _ = outbound.send(OutboundEvent::system(&rejection));
        return;
    };

    let observer: Arc<dyn ConversationObserver> = Arc::new(SocketObserver::new(outbound.clone()));
    let session = sessions.session_for(connection_id, observer).await;
    let (session_id, outcome) = {
        let mut session = session.lock().await;
        let outcome = session.handle_human_message(&text).await;
        (session.id().to_string(), outcome)
    };

    let failure = match outcome {
        Ok(TurnOutcome::AwaitingHuman) => return,
        Ok(TurnOutcome::RoundLimitReached { max_rounds }) => {
            sessions.remove(connection_id).await;
            ApplicationError::from(DomainError::from(ConversationError::RoundLimitReached {
                max_rounds,
            }))
        }
        Err(runtime_error) => runtime_error.into_application(),
    };

    let interface_error = failure.into_interface(&session_id);
    error!(
        event_name = "server.chat.turn_failed",
        correlation_id = %session_id,
        error = %interface_error,
        "chat turn ended without an assistant answer"
    );
    let _ = outbound.send(OutboundEvent::system(&interface_error));
}


#[cfg(test)]
mod tests {
    use printchat_agent::llm::{AssistantReply, LlmError};
    use printchat_core::domain::message::ToolCall;
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::testing::runtime;
    use super::{handle_frame, ConnectionId, OutboundEvent, SessionRegistry};

    fn drain(receiver: &mut mpsc::UnboundedReceiver<OutboundEvent>) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    fn user_message(text: &str) -> String {
        json!({"event": "user_message", "data": {"message": text}}).to_string()
    }

    #[test]
    fn outbound_event_uses_event_data_envelope() {
        let encoded = serde_json::to_value(OutboundEvent::message("assistant_agent", "Hi"))
            .expect("serialize");
        assert_eq!(
            encoded,
            json!({"event": "message", "data": {"sender": "assistant_agent", "content": "Hi"}})
        );
    }

    #[tokio::test]
    async fn frames_without_message_get_system_error() {
        let sessions = SessionRegistry::new(runtime(Vec::new(), 40));
        let (outbound, mut receiver) = mpsc::unbounded_channel();
        let connection = ConnectionId::new();

        for frame in [
            json!({"event": "user_message", "data": {}}).to_string(),
            json!({"event": "user_message", "data": {"message": ""}}).to_string(),
            "not json".to_string(),
        ] {
            handle_frame(&sessions, connection, &frame, &outbound).await;
        }

        let expected = OutboundEvent::message("system", "Error: No message provided.");
        assert_eq!(drain(&mut receiver), vec![expected.clone(), expected.clone(), expected]);
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn whitespace_message_is_forwarded_to_the_chat() {
        let sessions = SessionRegistry::new(runtime(vec![Ok(AssistantReply::text("Hello?"))], 40));
        let (outbound, mut receiver) = mpsc::unbounded_channel();

        handle_frame(&sessions, ConnectionId::new(), &user_message("   "), &outbound).await;

        assert_eq!(
            drain(&mut receiver),
            vec![
                OutboundEvent::message("the_human", "   "),
                OutboundEvent::message("assistant_agent", "Hello?"),
            ]
        );
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn tool_turn_only_forwards_visible_messages() {
        let sessions = SessionRegistry::new(runtime(
            vec![
                Ok(AssistantReply {
                    content: String::new(),
                    tool_calls: vec![ToolCall {
                        id: "call_1".to_string(),
                        name: "filter_products_by_category".to_string(),
                        arguments: r#"{"category_name":"Flyer"}"#.to_string(),
                    }],
                }),
                Ok(AssistantReply::text("We print A5 flyers in full colour.")),
            ],
            40,
        ));
        let (outbound, mut receiver) = mpsc::unbounded_channel();

        handle_frame(&sessions, ConnectionId::new(), &user_message("I need flyers"), &outbound).await;

        assert_eq!(
            drain(&mut receiver),
            vec![
                OutboundEvent::message("the_human", "I need flyers"),
                OutboundEvent::message("assistant_agent", "We print A5 flyers in full colour."),
            ]
        );
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn connections_get_independent_sessions() {
        let sessions = SessionRegistry::new(runtime(Vec::new(), 40));
        let (first_out, mut first_rx) = mpsc::unbounded_channel();
        let (second_out, mut second_rx) = mpsc::unbounded_channel();
        let first = ConnectionId::new();
        let second = ConnectionId::new();

        handle_frame(&sessions, first, &user_message("hello from one"), &first_out).await;
        handle_frame(&sessions, second, &user_message("hello from two"), &second_out).await;

        assert_eq!(sessions.len().await, 2);
        let first_events = drain(&mut first_rx);
        let second_events = drain(&mut second_rx);
        assert_eq!(first_events[0], OutboundEvent::message("the_human", "hello from one"));
        assert_eq!(second_events[0], OutboundEvent::message("the_human", "hello from two"));
        assert!(!first_events.iter().any(|event| matches!(
            event,
            OutboundEvent::Message { content, .. } if content.contains("two")
        )));

        assert!(sessions.remove(first).await);
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn round_limit_reports_and_next_message_starts_fresh() {
        let sessions = SessionRegistry::new(runtime(Vec::new(), 2));
        let (outbound, mut receiver) = mpsc::unbounded_channel();
        let connection = ConnectionId::new();

        handle_frame(&sessions, connection, &user_message("first"), &outbound).await;
        assert_eq!(drain(&mut receiver).len(), 2);

        handle_frame(&sessions, connection, &user_message("second"), &outbound).await;
        let events = drain(&mut receiver);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            OutboundEvent::Message { sender, content } if sender == "system" && content.contains("message limit")
        ));
        assert!(sessions.is_empty().await);

        handle_frame(&sessions, connection, &user_message("third"), &outbound).await;
        let events = drain(&mut receiver);
        assert_eq!(events[0], OutboundEvent::message("the_human", "third"));
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn llm_failure_is_reported_without_dropping_session() {
        let sessions = SessionRegistry::new(runtime(
            vec![Err(LlmError::Transport("connection refused".to_string()))],
            40,
        ));
        let (outbound, mut receiver) = mpsc::unbounded_channel();
        let connection = ConnectionId::new();

        handle_frame(&sessions, connection, &user_message("hi"), &outbound).await;

        assert_eq!(
            drain(&mut receiver),
            vec![
                OutboundEvent::message("the_human", "hi"),
                OutboundEvent::message(
                    "system",
                    "The assistant is temporarily unavailable. Please retry shortly."
                ),
            ]
        );
        assert_eq!(sessions.len().await, 1);
    }
}
