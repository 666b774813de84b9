//! Process-local session store.
//!
//! A session is guarded by its own lock (fine-grained, not one lock for the
//! whole store) so that chat turns for different sessions never contend
//! with each other; turns for the *same* session must still be serialised
//! by the caller (the chat entry point holds the session's lock for the
//! duration of a turn).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};

use reg_domain::trace::TraceEvent;

use crate::session::{AgentName, Session, SessionMetadata, Turn};

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Return the session's lock, creating it if absent. Callers that need
    /// to perform several operations atomically for one turn should lock
    /// the returned handle once and reuse it.
    pub fn get_or_create(&self, session_id: &str) -> Arc<Mutex<Session>> {
        if let Some(existing) = self.sessions.read().get(session_id) {
            return existing.clone();
        }

        let mut sessions = self.sessions.write();
        let handle = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                TraceEvent::SessionCreated {
                    session_id: session_id.to_string(),
                }
                .emit();
                Arc::new(Mutex::new(Session::new(session_id)))
            })
            .clone();
        handle
    }

    /// A snapshot of the session's current state, or `None` if it does not exist.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().get(session_id).map(|s| s.lock().clone())
    }

    pub fn append(&self, session_id: &str, turn: Turn) {
        let handle = self.get_or_create(session_id);
        let mut session = handle.lock();
        session.turns.push(turn);
        session.updated_at = Utc::now();
    }

    pub fn set_agent(&self, session_id: &str, agent: AgentName) {
        let handle = self.get_or_create(session_id);
        let mut session = handle.lock();
        session.agent = agent;
        session.updated_at = Utc::now();
    }

    pub fn set_step(&self, session_id: &str, step: Option<u32>) {
        let handle = self.get_or_create(session_id);
        let mut session = handle.lock();
        let from_step = session.step;
        session.step = step;
        session.updated_at = Utc::now();
        if from_step != step {
            if let Some(to_step) = step {
                TraceEvent::StepAdvanced {
                    session_id: session_id.to_string(),
                    agent: session.agent.as_str().to_string(),
                    from_step,
                    to_step,
                    server_driven: false,
                }
                .emit();
            }
        }
    }

    pub fn inject_metadata(&self, session_id: &str, metadata: SessionMetadata) {
        let handle = self.get_or_create(session_id);
        let mut session = handle.lock();
        session.metadata = metadata;
        session.updated_at = Utc::now();
    }

    /// Increment the re-registration security-check failure count and
    /// return the new total. Bounded lockout lives in the caller, which
    /// compares this against `SessionsConfig::max_security_attempts`.
    pub fn record_security_attempt(&self, session_id: &str) -> u32 {
        let handle = self.get_or_create(session_id);
        let mut session = handle.lock();
        session.security_attempts += 1;
        session.security_attempts
    }

    pub fn reset_security_attempts(&self, session_id: &str) {
        let handle = self.get_or_create(session_id);
        handle.lock().security_attempts = 0;
    }

    /// Evict a session entirely. The next `get_or_create` starts fresh.
    pub fn clear(&self, session_id: &str) {
        self.sessions.write().remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TurnRole;

    #[test]
    fn get_or_create_is_idempotent() {
        let store = SessionStore::new();
        let a = store.get_or_create("s1");
        let b = store.get_or_create("s1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn append_preserves_turn_order() {
        let store = SessionStore::new();
        store.append("s1", Turn::user("hello"));
        store.append("s1", Turn::assistant("hi there", AgentName::Orchestrator));
        let session = store.get("s1").unwrap();
        assert_eq!(session.turns.len(), 2);
        assert_eq!(session.turns[0].role, TurnRole::User);
        assert_eq!(session.turns[1].role, TurnRole::Assistant);
    }

    #[test]
    fn set_step_updates_pointer() {
        let store = SessionStore::new();
        store.get_or_create("s1");
        store.set_step("s1", Some(1));
        assert_eq!(store.get("s1").unwrap().step, Some(1));
        store.set_step("s1", Some(2));
        assert_eq!(store.get("s1").unwrap().step, Some(2));
    }

    #[test]
    fn clear_removes_session_entirely() {
        let store = SessionStore::new();
        store.append("s1", Turn::user("hello"));
        store.clear("s1");
        assert!(store.get("s1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn different_sessions_do_not_share_state() {
        let store = SessionStore::new();
        store.set_step("a", Some(5));
        store.set_step("b", Some(10));
        assert_eq!(store.get("a").unwrap().step, Some(5));
        assert_eq!(store.get("b").unwrap().step, Some(10));
    }

    #[test]
    fn security_attempts_increment_and_reset() {
        let store = SessionStore::new();
        assert_eq!(store.record_security_attempt("s1"), 1);
        assert_eq!(store.record_security_attempt("s1"), 2);
        store.reset_security_attempts("s1");
        assert_eq!(store.get("s1").unwrap().security_attempts, 0);
    }
}
