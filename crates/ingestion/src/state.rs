/// Where a single message is in its handling lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    Received,
    Decoded,
    DecodeFailed,
    Validated,
    ValidationFailed,
    Persisted,
    PersistFailed,
    Cached,
    DeadLettered,
    DeadLetterFailed,
    Acknowledged,
}

impl MessageState {
    pub fn can_transition_to(self, next: MessageState) -> bool {
        use MessageState::*;

        matches!(
            (self, next),
            (Received, Decoded)
                | (Received, DecodeFailed)
                | (Decoded, Validated)
                | (Decoded, ValidationFailed)
                | (Validated, Persisted)
                | (Validated, PersistFailed)
                | (Persisted, Cached)
                | (Cached, Acknowledged)
                | (DecodeFailed | ValidationFailed, DeadLettered | DeadLetterFailed)
                | (DeadLettered | DeadLetterFailed, Acknowledged)
        )
    }

    /// No further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageState::Acknowledged | MessageState::PersistFailed)
    }
}

/// Trail of states one message went through in the pipeline.
///
/// The acknowledge decision is derived from the last state: only
/// `Acknowledged` is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleOutcome {
    trail: Vec<MessageState>,
}

impl HandleOutcome {
    pub(crate) fn received() -> Self {
        Self {
            trail: vec![MessageState::Received],
        }
    }

    pub(crate) fn advance(&mut self, next: MessageState) {
        debug_assert!(
            self.state().can_transition_to(next),
            "invalid transition {:?} -> {:?}",
            self.state(),
            next
        );
        self.trail.push(next);
    }

    pub fn state(&self) -> MessageState {
        self.trail
            .last()
            .copied()
            .unwrap_or(MessageState::Received)
    }

    pub fn trail(&self) -> &[MessageState] {
        &self.trail
    }

    pub fn should_acknowledge(&self) -> bool {
        self.state() == MessageState::Acknowledged
    }

    /// Metrics label for the outcome
    pub fn label(&self) -> &'static str {
        if self.trail.contains(&MessageState::Cached) {
            "stored"
        } else if self.trail.contains(&MessageState::DeadLettered) {
            "dead_lettered"
        } else if self.trail.contains(&MessageState::DeadLetterFailed) {
            "dead_letter_failed"
        } else {
            "redelivery"
        }
    }
}
