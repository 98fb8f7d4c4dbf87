//! Session registry for the HTTP transport
//!
//! Maps server-minted session identifiers to the live transport driving each
//! session. This is the only shared mutable state of the HTTP variant; every
//! access goes through `lookup`, `register` and `unregister`.

use crate::error::SessionError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

/// Thread-safe map from session ID to transport handle
pub struct SessionRegistry<T> {
    sessions: RwLock<HashMap<String, Arc<T>>>,
}

impl<T> SessionRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Find the transport bound to `session_id`
    pub fn lookup(&self, session_id: &str) -> Option<Arc<T>> {
        self.read_sessions().get(session_id).cloned()
    }

    /// Bind `transport` to `session_id`
    ///
    /// # Errors
    /// - `AlreadyRegistered` if the ID is already bound; the existing binding is kept
    pub fn register(
        &self,
        session_id: impl Into<String>,
        transport: Arc<T>,
    ) -> Result<(), SessionError> {
        let session_id = session_id.into();
        let mut sessions = self.write_sessions();

        if sessions.contains_key(&session_id) {
            return Err(SessionError::AlreadyRegistered(session_id));
        }

        sessions.insert(session_id, transport);
        Ok(())
    }

    /// Remove the binding for `session_id`, if any
    ///
    /// Idempotent: duplicate close signals are harmless.
    pub fn unregister(&self, session_id: &str) -> Option<Arc<T>> {
        self.write_sessions().remove(session_id)
    }

    /// Remove the binding for `session_id` only if `predicate` accepts it
    ///
    /// Lets a closing transport remove itself without touching a newer
    /// binding under the same ID.
    pub fn unregister_if<F>(&self, session_id: &str, predicate: F) -> Option<Arc<T>>
    where
        F: FnOnce(&Arc<T>) -> bool,
    {
        let mut sessions = self.write_sessions();
        if sessions.get(session_id).is_some_and(predicate) {
            sessions.remove(session_id)
        } else {
            None
        }
    }

    /// Get current session count
    pub fn len(&self) -> usize {
        self.read_sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_sessions().is_empty()
    }

    /// IDs of all live sessions
    pub fn ids(&self) -> Vec<String> {
        self.read_sessions().keys().cloned().collect()
    }

    /// Point-in-time copy of all bindings, for work that must not hold the lock
    pub fn snapshot(&self) -> Vec<(String, Arc<T>)> {
        self.read_sessions()
            .iter()
            .map(|(id, transport)| (id.clone(), Arc::clone(transport)))
            .collect()
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<T>>> {
        self.sessions.write().unwrap_or_else(|poisoned| {
            warn!("session registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<T>>> {
        self.sessions.read().unwrap_or_else(|poisoned| {
            warn!("session registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl<T> Default for SessionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
