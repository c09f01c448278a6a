//! Per-connection session state.

use crate::state::ids::SessionId;

/// Lifecycle of one connected participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, greeting sent, waiting for a valid username.
    AwaitingUsername,
    /// Username accepted and subscribed to the room.
    Joined,
    /// Terminal. The session is never reused.
    Closed,
}

/// One connected participant, from accept to close.
///
/// Owned exclusively by the connection's inbound task; the room only ever
/// sees the username and mailbox handed over at join, so none of these
/// fields need synchronization.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    username: Option<String>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            state: SessionState::AwaitingUsername,
            username: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Username, set exactly once at join.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_joined(&self) -> bool {
        self.state == SessionState::Joined
    }

    /// Transition from `AwaitingUsername` to `Joined`.
    pub fn join(&mut self, username: String) {
        debug_assert_eq!(self.state, SessionState::AwaitingUsername);
        debug_assert!(!username.is_empty());
        self.username = Some(username);
        self.state = SessionState::Joined;
    }

    /// Terminal transition. Idempotent.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }
}
