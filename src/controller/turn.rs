use uuid::Uuid;

/// Per-turn context minted at submission time.
///
/// `speak_reply` captures the voice intent for this turn so the reply is
/// spoken (or not) based on how the turn was submitted, regardless of where
/// the shared voice flag has moved since.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnContext {
    /// Correlation id tagging this turn's messages
    pub id: Uuid,

    /// Whether the reply should be spoken once it arrives
    pub speak_reply: bool,
}

impl TurnContext {
    pub fn new(speak_reply: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            speak_reply,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turns_are_distinct() {
        let a = TurnContext::new(true);
        let b = TurnContext::new(true);
        assert_ne!(a.id, b.id);
        assert!(a.speak_reply);
        assert!(!TurnContext::new(false).speak_reply);
    }
}
