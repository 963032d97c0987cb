//! Session-scoped conversation memory.
//!
//! An explicit store owning its session map and clock. Appends to the same
//! session serialize through one coarse lock; the expected write volume is
//! a handful of turns per session, so finer-grained locking buys nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use brolly_core::error::{BrollyError, Result};
use brolly_core::{ChatTurn, Role};

// =============================================================================
// Clock
// =============================================================================

/// Time source injected into the store so expiry is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant, for expiry tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// =============================================================================
// SessionStore
// =============================================================================

struct Session {
    created_at: DateTime<Utc>,
    turns: Vec<ChatTurn>,
}

/// In-memory conversation store keyed by session id.
///
/// Append-only per session; entries are never reordered or edited. Sessions
/// idle past the expiry window are reclaimed by [`SessionStore::sweep`],
/// which is meant to run on a periodic schedule, never on the request path.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
    clock: Arc<dyn Clock>,
    expiry: Duration,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("expiry_hours", &self.expiry.num_hours())
            .finish()
    }
}

impl SessionStore {
    /// Store using the system clock.
    pub fn new(expiry_hours: u32) -> Self {
        Self::with_clock(expiry_hours, Arc::new(SystemClock))
    }

    /// Store with an injected clock.
    pub fn with_clock(expiry_hours: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            clock,
            expiry: Duration::hours(i64::from(expiry_hours)),
        }
    }

    /// Return the given id if it names an existing session, otherwise
    /// allocate a new session with an empty log.
    pub fn get_or_create(&self, session_id: Option<Uuid>) -> Result<Uuid> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| BrollyError::Session(format!("session lock poisoned: {}", e)))?;

        if let Some(id) = session_id {
            if sessions.contains_key(&id) {
                return Ok(id);
            }
        }

        let id = Uuid::new_v4();
        sessions.insert(
            id,
            Session {
                created_at: self.clock.now(),
                turns: Vec::new(),
            },
        );
        debug!(session = %id, "Created session");
        Ok(id)
    }

    /// Append a timestamped turn, creating the session if it does not exist.
    pub fn append(&self, session_id: Uuid, role: Role, content: &str) -> Result<()> {
        let now = self.clock.now();
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| BrollyError::Session(format!("session lock poisoned: {}", e)))?;

        let session = sessions.entry(session_id).or_insert_with(|| Session {
            created_at: now,
            turns: Vec::new(),
        });
        session.turns.push(ChatTurn {
            role,
            content: content.to_string(),
            timestamp: now,
        });
        Ok(())
    }

    /// The last `max_n` turns of a session, oldest first. Unknown sessions
    /// yield an empty sequence.
    pub fn recent(&self, session_id: Uuid, max_n: usize) -> Result<Vec<ChatTurn>> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|e| BrollyError::Session(format!("session lock poisoned: {}", e)))?;

        let Some(session) = sessions.get(&session_id) else {
            return Ok(Vec::new());
        };
        let skip = session.turns.len().saturating_sub(max_n);
        Ok(session.turns[skip..].to_vec())
    }

    /// Remove sessions whose oldest entry has aged past the expiry window.
    /// Sessions that never received a turn age from their creation time.
    /// Returns the number removed.
    pub fn sweep(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| BrollyError::Session(format!("session lock poisoned: {}", e)))?;

        let before = sessions.len();
        sessions.retain(|_, session| {
            let oldest = session
                .turns
                .first()
                .map(|turn| turn.timestamp)
                .unwrap_or(session.created_at);
            now - oldest <= self.expiry
        });
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "Swept expired sessions");
        }
        Ok(removed)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> Result<usize> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|e| BrollyError::Session(format!("session lock poisoned: {}", e)))?;
        Ok(sessions.len())
    }
}

/// Render turns as a prompt transcript: one `"Role: content"` line per turn,
/// empty string for no turns.
pub fn format_transcript(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> SessionStore {
        SessionStore::new(24)
    }

    fn make_fixed_store() -> (SessionStore, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let store = SessionStore::with_clock(24, clock.clone());
        (store, clock)
    }

    // ---- get_or_create ----

    #[test]
    fn test_get_or_create_none_allocates() {
        let store = make_store();
        let id = store.get_or_create(None).unwrap();
        assert_ne!(id, Uuid::nil());
        assert_eq!(store.session_count().unwrap(), 1);
    }

    #[test]
    fn test_get_or_create_existing_returns_same_id() {
        let store = make_store();
        let id = store.get_or_create(None).unwrap();
        let again = store.get_or_create(Some(id)).unwrap();
        assert_eq!(id, again);
        assert_eq!(store.session_count().unwrap(), 1);
    }

    #[test]
    fn test_get_or_create_unknown_id_allocates_new() {
        let store = make_store();
        let unknown = Uuid::new_v4();
        let id = store.get_or_create(Some(unknown)).unwrap();
        assert_ne!(id, unknown);
    }

    // ---- append / recent ----

    #[test]
    fn test_append_then_recent() {
        let store = make_store();
        let id = store.get_or_create(None).unwrap();
        store.append(id, Role::User, "hello").unwrap();

        let turns = store.recent(id, 10).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "hello");
    }

    #[test]
    fn test_recent_is_oldest_first() {
        let store = make_store();
        let id = store.get_or_create(None).unwrap();
        store.append(id, Role::User, "first").unwrap();
        store.append(id, Role::Assistant, "second").unwrap();
        store.append(id, Role::User, "third").unwrap();

        let turns = store.recent(id, 10).unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_recent_window_keeps_latest() {
        let store = make_store();
        let id = store.get_or_create(None).unwrap();
        for i in 0..5 {
            store.append(id, Role::User, &format!("turn {}", i)).unwrap();
        }

        let turns = store.recent(id, 2).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "turn 3");
        assert_eq!(turns[1].content, "turn 4");
    }

    #[test]
    fn test_recent_unknown_session_is_empty() {
        let store = make_store();
        assert!(store.recent(Uuid::new_v4(), 10).unwrap().is_empty());
    }

    #[test]
    fn test_append_creates_missing_session() {
        let store = make_store();
        let id = Uuid::new_v4();
        store.append(id, Role::User, "orphan turn").unwrap();
        assert_eq!(store.recent(id, 10).unwrap().len(), 1);
    }

    // ---- format ----

    #[test]
    fn test_format_transcript_lines() {
        let store = make_store();
        let id = store.get_or_create(None).unwrap();
        store.append(id, Role::User, "what does it cover?").unwrap();
        store.append(id, Role::Assistant, "Hospitalization.").unwrap();

        let text = format_transcript(&store.recent(id, 10).unwrap());
        assert_eq!(text, "User: what does it cover?\nAssistant: Hospitalization.");
    }

    #[test]
    fn test_format_transcript_empty() {
        assert_eq!(format_transcript(&[]), "");
    }

    // ---- sweep ----

    #[test]
    fn test_sweep_removes_expired_session() {
        let (store, clock) = make_fixed_store();
        let id = store.get_or_create(None).unwrap();
        store.append(id, Role::User, "hello").unwrap();

        clock.advance(Duration::hours(25));
        assert_eq!(store.sweep().unwrap(), 1);
        assert_eq!(store.session_count().unwrap(), 0);
    }

    #[test]
    fn test_sweep_keeps_fresh_session() {
        let (store, clock) = make_fixed_store();
        let id = store.get_or_create(None).unwrap();
        store.append(id, Role::User, "hello").unwrap();

        clock.advance(Duration::hours(23));
        assert_eq!(store.sweep().unwrap(), 0);
        assert_eq!(store.session_count().unwrap(), 1);
    }

    #[test]
    fn test_sweep_ages_by_oldest_turn() {
        let (store, clock) = make_fixed_store();
        let id = store.get_or_create(None).unwrap();
        store.append(id, Role::User, "old").unwrap();

        // Later activity does not refresh the session
        clock.advance(Duration::hours(20));
        store.append(id, Role::Assistant, "newer").unwrap();
        clock.advance(Duration::hours(5));

        assert_eq!(store.sweep().unwrap(), 1);
    }

    #[test]
    fn test_sweep_expires_empty_session_by_creation_time() {
        let (store, clock) = make_fixed_store();
        store.get_or_create(None).unwrap();

        clock.advance(Duration::hours(25));
        assert_eq!(store.sweep().unwrap(), 1);
    }

    #[test]
    fn test_sweep_mixed_sessions() {
        let (store, clock) = make_fixed_store();
        let old = store.get_or_create(None).unwrap();
        store.append(old, Role::User, "stale").unwrap();

        clock.advance(Duration::hours(25));
        let fresh = store.get_or_create(None).unwrap();
        store.append(fresh, Role::User, "active").unwrap();

        assert_eq!(store.sweep().unwrap(), 1);
        assert!(store.recent(old, 10).unwrap().is_empty());
        assert_eq!(store.recent(fresh, 10).unwrap().len(), 1);
    }

    // ---- concurrency ----

    #[test]
    fn test_concurrent_appends_to_same_session() {
        use std::thread;

        let store = Arc::new(make_store());
        let id = store.get_or_create(None).unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for j in 0..20 {
                    store
                        .append(id, Role::User, &format!("msg {}-{}", i, j))
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.recent(id, 1000).unwrap().len(), 200);
    }

    #[test]
    fn test_concurrent_sessions_do_not_interfere() {
        use std::thread;

        let store = Arc::new(make_store());
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let id = store.get_or_create(None).unwrap();
                store.append(id, Role::User, &format!("from thread {}", i)).unwrap();
                (id, store.recent(id, 10).unwrap().len())
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(store.session_count().unwrap(), 8);
        for (_, len) in results {
            assert_eq!(len, 1);
        }
    }
}
