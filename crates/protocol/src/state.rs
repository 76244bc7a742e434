//! Lifecycle states of a remote session.

use std::fmt;

/// Where a session is in the connect → login → logout lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No session identifier has been obtained yet, or the connection was lost.
    Disconnected,
    /// A session identifier is held but no user is logged in.
    Connected,
    /// A user is logged in on the held session.
    Authenticated,
}

impl SessionState {
    /// True for every state that holds a session identifier.
    pub fn has_session(self) -> bool {
        !matches!(self, SessionState::Disconnected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::Authenticated => "authenticated",
        };
        f.write_str(name)
    }
}
