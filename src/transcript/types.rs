use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text of the transient placeholder shown while a reply is pending.
pub const PLACEHOLDER_TEXT: &str = "Thinking...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    /// Submission this message belongs to, if any. Placeholders are always
    /// tagged so their removal targets the right turn.
    pub turn_id: Option<Uuid>,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            turn_id: None,
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a message tagged with the turn that produced it
    pub fn for_turn(turn_id: Uuid, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            turn_id: Some(turn_id),
            ..Self::new(sender, text)
        }
    }

    /// Create the pending-reply placeholder for a turn
    pub fn placeholder(turn_id: Uuid) -> Self {
        Self::for_turn(turn_id, Sender::Bot, PLACEHOLDER_TEXT)
    }

    /// Whether this message is the pending-reply placeholder
    pub fn is_placeholder(&self) -> bool {
        self.sender == Sender::Bot && self.text == PLACEHOLDER_TEXT
    }
}
