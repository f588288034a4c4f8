use super::types::Message;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// Append-only conversation log, shared between the controller and the UI.
///
/// Ordering is append order; the only removal is the pending-reply
/// placeholder, targeted by the turn that created it.
#[derive(Debug, Clone)]
pub struct TranscriptLog {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn append(&self, message: Message) {
        self.messages.write().push(message);
    }

    /// Remove the placeholder tagged with `turn_id`, wherever it sits.
    ///
    /// Idempotent: returns false when no such placeholder exists.
    pub fn remove_placeholder(&self, turn_id: Uuid) -> bool {
        let mut messages = self.messages.write();
        if let Some(pos) = messages
            .iter()
            .position(|m| m.turn_id == Some(turn_id) && m.is_placeholder())
        {
            messages.remove(pos);
            true
        } else {
            false
        }
    }

    /// Remove the most recent message if it is a placeholder.
    ///
    /// Used as a defensive sweep before appending a new placeholder, so at
    /// most one "Thinking..." is ever visible. Idempotent.
    pub fn remove_trailing_placeholder(&self) -> bool {
        let mut messages = self.messages.write();
        if messages.last().is_some_and(Message::is_placeholder) {
            messages.pop();
            true
        } else {
            false
        }
    }

    pub fn last(&self) -> Option<Message> {
        self.messages.read().last().cloned()
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn clear(&self) {
        self.messages.write().clear();
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

impl Default for TranscriptLog {
    fn default() -> Self {
        Self::new()
    }
}
