use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub message: String,
}

/// In-memory chat history keyed by session id. Sessions live for the process
/// lifetime unless explicitly cleared.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Vec<ChatTurn>>>,
    counter: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
        }
    }

    pub fn new_session_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("sess-{}-{}", chrono::Utc::now().timestamp_millis(), n)
    }

    pub fn history(&self, session_id: &str) -> Vec<ChatTurn> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn append(&self, session_id: &str, role: Role, message: String) {
        self.sessions
            .write()
            .entry(session_id.to_string())
            .or_default()
            .push(ChatTurn { role, message });
    }

    pub fn clear(&self, session_id: &str) -> bool {
        self.sessions.write().remove(session_id).is_some()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_history_round_trip() {
        let store = SessionStore::new();
        let id = store.new_session_id();
        store.append(&id, Role::User, "hello".to_string());
        store.append(&id, Role::Model, "hi".to_string());

        let history = store.history(&id);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].message, "hi");
    }

    #[test]
    fn clear_removes_only_the_given_session() {
        let store = SessionStore::new();
        let a = store.new_session_id();
        let b = store.new_session_id();
        assert_ne!(a, b);
        store.append(&a, Role::User, "x".to_string());
        store.append(&b, Role::User, "y".to_string());

        assert!(store.clear(&a));
        assert!(!store.clear(&a));
        assert!(store.history(&a).is_empty());
        assert_eq!(store.history(&b).len(), 1);
    }
}
