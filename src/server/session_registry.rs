//! Session registry: user id to live connection handle.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::domain::UserId;

/// Handle to one live connection's outbox.
///
/// Lines pushed here are drained by that connection's writer task, so a push
/// never blocks the caller; a closed receiver means the connection is gone
/// and the line is dropped silently.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: Uuid,
    outbox: mpsc::UnboundedSender<String>,
}

impl SessionHandle {
    pub fn new(session_id: Uuid, outbox: mpsc::UnboundedSender<String>) -> Self {
        Self { session_id, outbox }
    }

    /// Token identifying the connection instance that owns this handle
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Best-effort write; returns false if the connection is gone
    pub fn push_line(&self, line: String) -> bool {
        self.outbox.send(line).is_ok()
    }
}

/// Tracks which users currently have a live connection.
///
/// At most one session per user id: a later login overwrites the earlier
/// handle (last login wins). Unregistration is guarded by the session token
/// so a stale handler cannot evict a newer login.
pub struct SessionRegistry {
    online: RwLock<HashMap<UserId, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            online: RwLock::new(HashMap::new()),
        }
    }

    /// Install the active handle for `user_id`, evicting any previous login
    pub async fn register(&self, user_id: UserId, handle: SessionHandle) {
        self.online.write().await.insert(user_id, handle);
    }

    /// Remove the binding only if `session_id` still owns it.
    ///
    /// Returns whether a binding was removed.
    pub async fn unregister(&self, user_id: UserId, session_id: Uuid) -> bool {
        let mut online = self.online.write().await;
        match online.get(&user_id) {
            Some(handle) if handle.session_id() == session_id => {
                online.remove(&user_id);
                true
            }
            _ => false,
        }
    }

    pub async fn is_online(&self, user_id: UserId) -> bool {
        self.online.read().await.contains_key(&user_id)
    }

    pub async fn lookup(&self, user_id: UserId) -> Option<SessionHandle> {
        self.online.read().await.get(&user_id).cloned()
    }

    /// Best-effort push to a user's connection, if any.
    ///
    /// Returns whether a line was handed to a live outbox.
    pub async fn push_line(&self, user_id: UserId, line: String) -> bool {
        match self.lookup(user_id).await {
            Some(handle) => handle.push_line(line),
            None => false,
        }
    }

    pub async fn online_count(&self) -> usize {
        self.online.read().await.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
