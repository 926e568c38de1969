use crate::config::Credential;
use crate::types::ApiMessage;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_SESSION_CAPACITY: usize = 64;
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(3600);

/// Per-session relay state: prompt configuration plus the running transcript.
#[derive(Debug, Clone)]
pub struct AgentSession {
    pub system_prompt: String,
    pub allowed_tools: Vec<String>,
    pub credential: Option<Credential>,
    pub base_url: Option<String>,
    pub history: Vec<ApiMessage>,
}

struct SessionEntry {
    session: AgentSession,
    last_used: Instant,
}

/// Bounded in-memory session map. Idle sessions expire after `idle_ttl`;
/// at capacity the least-recently-used session is evicted. Kept behind a
/// mutex by the server; this type itself is single-writer.
pub struct SessionStore {
    sessions: HashMap<String, SessionEntry>,
    capacity: usize,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_CAPACITY, DEFAULT_IDLE_TTL)
    }
}

impl SessionStore {
    pub fn new(capacity: usize, idle_ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            capacity: capacity.max(1),
            idle_ttl,
        }
    }

    pub fn insert(&mut self, id: impl Into<String>, session: AgentSession) {
        self.sweep_expired();
        let id = id.into();
        if !self.sessions.contains_key(&id) && self.sessions.len() >= self.capacity {
            self.evict_least_recently_used();
        }
        self.sessions.insert(
            id,
            SessionEntry {
                session,
                last_used: Instant::now(),
            },
        );
    }

    /// Fetch a session, refreshing its idle clock. Expired sessions are
    /// removed first and read as absent.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut AgentSession> {
        self.sweep_expired();
        let entry = self.sessions.get_mut(id)?;
        entry.last_used = Instant::now();
        Some(&mut entry.session)
    }

    pub fn remove(&mut self, id: &str) -> Option<AgentSession> {
        self.sessions.remove(id).map(|entry| entry.session)
    }

    /// Sorted ids of live sessions. Expired entries are removed first so a
    /// listed session is also retrievable.
    pub fn ids(&mut self) -> Vec<String> {
        self.sweep_expired();
        let mut ids: Vec<String> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn sweep_expired(&mut self) {
        let idle_ttl = self.idle_ttl;
        self.sessions
            .retain(|_, entry| entry.last_used.elapsed() < idle_ttl);
    }

    fn evict_least_recently_used(&mut self) {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            self.sessions.remove(&id);
        }
    }
}
