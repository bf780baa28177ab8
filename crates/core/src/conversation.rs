use thiserror::Error;

use crate::domain::message::Message;

pub const DEFAULT_MAX_ROUNDS: usize = 40;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("conversation reached its round limit of {max_rounds}")]
    RoundLimitReached { max_rounds: usize },
}

/// Append-only message log for one chat session. Every appended message counts
/// as one round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationState {
    messages: Vec<Message>,
    max_rounds: usize,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROUNDS)
    }
}

impl ConversationState {
    pub fn new(max_rounds: usize) -> Self {
        Self { messages: Vec::new(), max_rounds }
    }

    pub fn append(&mut self, message: Message) -> Result<&Message, ConversationError> {
        if self.is_exhausted() {
            return Err(ConversationError::RoundLimitReached { max_rounds: self.max_rounds });
        }
        self.messages.push(message);
        Ok(&self.messages[self.messages.len() - 1])
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn rounds(&self) -> usize {
        self.messages.len()
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    pub fn is_exhausted(&self) -> bool {
        self.messages.len() >= self.max_rounds
    }
}
