use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed roster of conversational actors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Participant {
    Human,
    Assistant,
    Executor,
}

impl Participant {
    pub const ROSTER: [Participant; 3] = [Self::Human, Self::Assistant, Self::Executor];

    /// Stable name used as the outbound `sender` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Human => "the_human",
            Self::Assistant => "assistant_agent",
            Self::Executor => "executor_agent",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ROSTER.into_iter().find(|participant| participant.name() == name)
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
