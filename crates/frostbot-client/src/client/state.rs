use strum_macros::Display;

/// Progress of one bot through login and into the world.
///
/// Published on a `watch` channel; the happy path visits every state from
/// `Idle` to `Streaming` in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum HandshakeState {
    Idle,
    Connected,
    ChallengeSent,
    ChallengeReplyReceived,
    ProofSent,
    ProofVerified,
    RealmsRequested,
    RealmsReceived,
    RealmSelected,
    WorldConnected,
    WorldChallengeReceived,
    SessionSent,
    WorldAuthVerified,
    Streaming,
    /// The world connection closed after streaming.
    Disconnected,
    Failed,
    Cancelled,
}

impl HandshakeState {
    /// True once the session can no longer make progress.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed | Self::Cancelled)
    }

    pub fn is_streaming(self) -> bool {
        self == Self::Streaming
    }
}

/// How a session that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// Reached `Streaming` and later disconnected or was stopped.
    Completed,
    /// A callback cancelled the step that follows the given state.
    Cancelled(HandshakeState),
    /// Shutdown was requested before the session reached `Streaming`.
    Stopped(HandshakeState),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!HandshakeState::Idle.is_terminal());
        assert!(!HandshakeState::Streaming.is_terminal());
        assert!(HandshakeState::Failed.is_terminal());
        assert!(HandshakeState::Cancelled.is_terminal());
        assert!(HandshakeState::Disconnected.is_terminal());
        assert_eq!(HandshakeState::ProofVerified.to_string(), "ProofVerified");
    }
}
