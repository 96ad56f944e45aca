//! Session layer: owns each conversation's history, serializes turns within a
//! session, and turns failed turns into a marked error reply.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::chat::history::{ConversationHistory, ConversationTurn};
use crate::chat::orchestrator::Orchestrator;

pub const ERROR_REPLY_PREFIX: &str = "Sorry, something went wrong: ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReply {
    pub answer: String,
    pub is_error: bool,
}

/// Runs one turn against `history`. On success the history becomes the
/// orchestrator's updated copy; on failure the user message (if any) and an
/// error placeholder are appended instead.
pub async fn run_turn(
    orchestrator: &Orchestrator,
    history: &mut ConversationHistory,
    message: &str,
) -> TurnReply {
    match orchestrator.process_turn(history, message).await {
        Ok(outcome) => {
            debug!(
                "Answered {} request via {} nodes",
                outcome.intent.request_type,
                outcome.path.len()
            );
            *history = outcome.history;
            TurnReply {
                answer: outcome.answer.answer,
                is_error: false,
            }
        }
        Err(e) => {
            error!("Turn failed: {e}");
            let answer = format!("{ERROR_REPLY_PREFIX}{e}");
            if !message.trim().is_empty() {
                history.push(ConversationTurn::user(message.trim()));
            }
            history.push(ConversationTurn::assistant(answer.clone()));
            TurnReply {
                answer,
                is_error: true,
            }
        }
    }
}

pub type SessionHandle = Arc<Mutex<ConversationHistory>>;

pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

struct SessionEntry {
    handle: SessionHandle,
    last_used: Instant,
}

impl SessionEntry {
    /// A handle held outside the store means a turn is running on it.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.handle) > 1
    }
}

/// In-memory session registry. Each session's history sits behind its own
/// mutex, so two turns for one session never interleave. Sessions idle longer
/// than `idle_ttl` are dropped, and the store never holds more than
/// `max_sessions` (least recently used goes first).
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    history_limit: usize,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(history_limit: usize) -> Self {
        Self::with_limits(history_limit, DEFAULT_SESSION_IDLE_TTL, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_limits(history_limit: usize, idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            history_limit,
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Returns the session for `id`, creating it when `id` is `None` or unknown.
    pub async fn open(&self, id: Option<Uuid>) -> (Uuid, SessionHandle) {
        if let Some(id) = id {
            if let Some(handle) = self.get(id).await {
                return (id, handle);
            }
        }

        let id = id.unwrap_or_else(Uuid::new_v4);
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&id) {
            self.evict(&mut sessions, now);
        }
        let entry = sessions.entry(id).or_insert_with(|| {
            info!("Opened session {id}");
            SessionEntry {
                handle: Arc::new(Mutex::new(ConversationHistory::new(self.history_limit))),
                last_used: now,
            }
        });
        entry.last_used = now;
        (id, entry.handle.clone())
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_used = Instant::now();
        Some(entry.handle.clone())
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every idle session; returns how many went.
    pub async fn sweep_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        self.drop_idle(&mut sessions, Instant::now())
    }

    fn drop_idle(&self, sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant) -> usize {
        let before = sessions.len();
        sessions.retain(|_, e| e.in_use() || now.duration_since(e.last_used) < self.idle_ttl);
        let dropped = before - sessions.len();
        if dropped > 0 {
            debug!("Dropped {dropped} idle sessions");
        }
        dropped
    }

    /// Makes room for one new session.
    fn evict(&self, sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant) {
        self.drop_idle(sessions, now);
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(_, e)| !e.in_use())
                .min_by_key(|(_, e)| e.last_used)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                    warn!("Session limit {} reached, evicted {id}", self.max_sessions);
                }
                None => break,
            }
        }
    }
}
