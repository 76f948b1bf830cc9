//! Live session registry.
//!
//! Maps confirmed session ids to their transports. Entries are added only
//! by a transport's handshake callback and removed only by its close
//! callback, so every path that ends a session (DELETE, shutdown, a
//! transport closing itself) updates the registry exactly once.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use searchlight_mcp::{SessionId, SessionTransport, SharedService};
use tracing::{debug, info};

use crate::error::Result;

type SessionMap = HashMap<SessionId, Arc<SessionTransport>>;

/// Registry of active sessions.
///
/// Cheap to clone; clones share the same map.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<SessionMap>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the transport of a registered session.
    pub fn get(&self, session_id: &SessionId) -> Option<Arc<SessionTransport>> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Whether `session_id` is registered.
    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Ids of all registered sessions.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Create a pending transport bound to `service`.
    ///
    /// The transport registers itself when its handshake assigns an id and
    /// removes itself when it closes. A transport whose handshake never
    /// completes is never registered and disappears once dropped.
    pub fn create(&self, service: SharedService) -> Result<Arc<SessionTransport>> {
        let transport = Arc::new(SessionTransport::new());
        transport.connect(service)?;

        let sessions = Arc::downgrade(&self.sessions);
        let this = Arc::downgrade(&transport);
        transport.on_initialized(move |session_id| {
            if let (Some(sessions), Some(transport)) = (sessions.upgrade(), this.upgrade()) {
                register(&sessions, session_id, transport);
            }
        });

        let sessions = Arc::downgrade(&self.sessions);
        transport.on_closed(move |session_id| unregister(&sessions, &session_id));

        Ok(transport)
    }

    /// Close a registered session.
    ///
    /// Returns `false` if the id is not registered.
    pub fn close(&self, session_id: &SessionId) -> bool {
        // Clone out of the lock: the close callback takes the write lock.
        let Some(transport) = self.get(session_id) else {
            return false;
        };
        transport.close();
        true
    }

    /// Close every registered session. Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let transports: Vec<_> = self.sessions.read().values().cloned().collect();
        let closed = transports.iter().filter(|t| t.close()).count();
        if closed > 0 {
            info!(closed, "Closed all sessions");
        }
        closed
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .finish()
    }
}

fn register(sessions: &RwLock<SessionMap>, session_id: SessionId, transport: Arc<SessionTransport>) {
    let count = {
        let mut sessions = sessions.write();
        sessions.insert(session_id.clone(), transport);
        sessions.len()
    };
    debug!(session_id = %session_id, active = count, "Session registered");
}

fn unregister(sessions: &Weak<RwLock<SessionMap>>, session_id: &SessionId) {
    let Some(sessions) = sessions.upgrade() else {
        return;
    };
    // Drop the transport outside the lock.
    let (removed, count) = {
        let mut sessions = sessions.write();
        let removed = sessions.remove(session_id);
        (removed, sessions.len())
    };
    if removed.is_some() {
        debug!(session_id = %session_id, active = count, "Session removed");
    }
}
