//! In-process conversational memory.
//!
//! Sessions are created lazily on first reference and hold an append-only,
//! chronologically ordered message list. Each session sits behind its own
//! async mutex, so concurrent requests bearing the same key serialize their
//! reads and appends per key. The manager map itself is guarded by a sync
//! mutex held only for map operations, never across an await.
//!
//! The manager is bounded: past `max_sessions` keys, the least recently
//! used session is evicted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use serde::Serialize;
use tokio::sync::Mutex;

pub const ROLE_USER: &str = "user";
pub const ROLE_AGENT: &str = "agent";

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Default)]
pub struct SessionMemory {
    messages: Vec<Message>,
}

impl SessionMemory {
    pub fn append(&mut self, role: &str, content: &str) {
        self.messages.push(Message {
            role: role.to_string(),
            content: content.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

pub type SessionHandle = Arc<Mutex<SessionMemory>>;

struct SessionEntry {
    memory: SessionHandle,
    last_used: u64,
}

pub struct MemoryManager {
    sessions: StdMutex<HashMap<String, SessionEntry>>,
    clock: AtomicU64,
    max_sessions: usize,
}

impl MemoryManager {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: StdMutex::new(HashMap::new()),
            clock: AtomicU64::new(0),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Get or lazily create the session for `session_id`. Creation is
    /// idempotent; repeated calls return handles to the same memory.
    pub fn get_session(&self, session_id: &str) -> SessionHandle {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst);
        let mut sessions = self.sessions.lock().expect("session map poisoned");

        if let Some(entry) = sessions.get_mut(session_id) {
            entry.last_used = tick;
            return entry.memory.clone();
        }

        if sessions.len() >= self.max_sessions {
            if let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone())
            {
                tracing::debug!("Evicting least recently used session '{}'", oldest);
                sessions.remove(&oldest);
            }
        }

        let handle: SessionHandle = Arc::new(Mutex::new(SessionMemory::default()));
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                memory: handle.clone(),
                last_used: tick,
            },
        );
        handle
    }

    /// Drop one session and its history. Returns whether the key existed.
    pub fn clear(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock().expect("session map poisoned");
        sessions.remove(session_id).is_some()
    }

    pub fn clear_all(&self) {
        let mut sessions = self.sessions.lock().expect("session map poisoned");
        sessions.clear();
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().expect("session map poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn messages_preserve_insertion_order() {
        let manager = MemoryManager::new(16);
        let session = manager.get_session("s1");

        {
            let mut memory = session.lock().await;
            memory.append(ROLE_USER, "a");
            memory.append(ROLE_AGENT, "b");
            memory.append(ROLE_USER, "c");
        }

        let memory = session.lock().await;
        let contents: Vec<&str> = memory.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
        assert_eq!(memory.messages()[0].role, ROLE_USER);
        assert_eq!(memory.messages()[1].role, ROLE_AGENT);
    }

    #[tokio::test]
    async fn get_session_is_lazy_and_idempotent() {
        let manager = MemoryManager::new(16);
        assert_eq!(manager.session_count(), 0);

        let first = manager.get_session("s1");
        first.lock().await.append(ROLE_USER, "hello");

        let second = manager.get_session("s1");
        assert_eq!(second.lock().await.len(), 1);
        assert_eq!(manager.session_count(), 1);
    }

    #[tokio::test]
    async fn clear_drops_history() {
        let manager = MemoryManager::new(16);
        manager
            .get_session("s1")
            .lock()
            .await
            .append(ROLE_USER, "hello");

        assert!(manager.clear("s1"));
        assert!(!manager.clear("s1"));
        assert!(manager.get_session("s1").lock().await.is_empty());
    }

    #[tokio::test]
    async fn session_clear_empties_messages() {
        let manager = MemoryManager::new(16);
        let session = manager.get_session("s1");

        let mut memory = session.lock().await;
        memory.append(ROLE_USER, "a");
        memory.append(ROLE_AGENT, "b");
        memory.clear();
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn least_recently_used_session_is_evicted() {
        let manager = MemoryManager::new(2);

        manager.get_session("s1").lock().await.append(ROLE_USER, "1");
        manager.get_session("s2").lock().await.append(ROLE_USER, "2");
        // Touch s1 so s2 becomes the eviction candidate.
        manager.get_session("s1");
        manager.get_session("s3");

        assert_eq!(manager.session_count(), 2);
        assert_eq!(manager.get_session("s1").lock().await.len(), 1);
        // s2 was evicted; referencing it again yields a fresh empty session.
        assert!(manager.get_session("s2").lock().await.is_empty());
    }
}
