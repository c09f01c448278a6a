//! Error taxonomy for sessions and room operations.

use thiserror::Error;

use crate::protocol::LineError;

/// Errors that terminate a single session.
///
/// None of these escape the session's own tasks; the connection handler
/// resolves them and the gateway only logs.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The proposed username was empty or contained a character that is
    /// not a letter or digit.
    #[error("invalid username: {0:?}")]
    InvalidUsername(String),

    /// The client did not complete the username handshake in time.
    #[error("handshake timed out")]
    HandshakeTimeout,

    /// The stream ended before a username was received.
    #[error("end of stream")]
    EndOfStream,

    /// Reading from or writing to the transport failed.
    #[error(transparent)]
    Transport(#[from] LineError),
}

impl SessionError {
    /// Static label for structured log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidUsername(_) => "invalid_username",
            Self::HandshakeTimeout => "handshake_timeout",
            Self::EndOfStream => "end_of_stream",
            Self::Transport(_) => "transport",
        }
    }
}

/// Internal guard errors for room operations. Not user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// A join was attempted for a session that never negotiated a username.
    #[error("session has no username")]
    InvalidSession,
}
