//! Speaker selection for the three-participant chat loop.
//!
//! The rotation is fixed:
//!
//! ```text
//! Human ──▶ Assistant ──(tool calls)──▶ Executor
//!              ▲   │                       │
//!              │   └──(no tool calls)──▶ Human
//!              └───────────────────────────┘
//! ```
//!
//! Termination (round cap, waiting on the customer) is the runtime's concern.

use thiserror::Error;

use crate::domain::message::Message;
use crate::domain::participant::Participant;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("unrecognized speaker `{0}`; expected one of the_human, assistant_agent, executor_agent")]
    UnrecognizedSpeaker(String),
}

pub fn next_speaker(last_speaker: Participant, history: &[Message]) -> Participant {
    match last_speaker {
        Participant::Human => Participant::Assistant,
        Participant::Assistant => {
            if history.last().is_some_and(Message::requests_tools) {
                Participant::Executor
            } else {
                Participant::Human
            }
        }
        Participant::Executor => Participant::Assistant,
    }
}

/// Name-based entry point. A speaker outside the roster is a contract
/// violation and is reported instead of being routed anywhere.
pub fn select_next_speaker(
    last_speaker: &str,
    history: &[Message],
) -> Result<Participant, TurnError> {
    let participant = Participant::from_name(last_speaker)
        .ok_or_else(|| TurnError::UnrecognizedSpeaker(last_speaker.to_string()))?;
    Ok(next_speaker(participant, history))
}
