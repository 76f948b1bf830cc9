//! Session identity and lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque session identifier, generated by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The identifier as sent in the `Mcp-Session-Id` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where a transport is in its lifecycle.
///
/// `Pending → Active → Closed`; `Pending → Closed` is also allowed when a
/// transport is torn down before the handshake completes. `Closed` is
/// terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, waiting for the initialize handshake.
    Pending,
    /// Handshake done; the session is registered under this id.
    Active(SessionId),
    /// Terminated.
    Closed,
}

impl SessionState {
    /// The session id, if active.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::Active(id) => Some(id),
            _ => None,
        }
    }

    /// Whether the session has been terminated.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_session_id_serializes_as_string() {
        let id = SessionId::from("abc");
        assert_eq!(serde_json::to_value(&id).unwrap(), "abc");
        assert_eq!(id.to_string(), "abc");
    }

    #[test]
    fn test_state_accessors() {
        let id = SessionId::from("s-1");
        assert_eq!(SessionState::Active(id.clone()).session_id(), Some(&id));
        assert_eq!(SessionState::Pending.session_id(), None);
        assert!(SessionState::Closed.is_closed());
        assert!(!SessionState::Pending.is_closed());
    }
}
