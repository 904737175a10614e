//! Sessions and the in-memory session service.

use super::{SessionKey, SharedState};
use crate::utils::{now_utc, Timestamp};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A shared, lockable session. A run holds the lock for its whole duration.
pub type SessionHandle = Arc<Mutex<Session>>;

/// One execution context: identity plus the state for that run.
#[derive(Debug, Clone)]
pub struct Session {
    key: SessionKey,
    state: SharedState,
    created_at: Timestamp,
    last_update_time: Timestamp,
    has_run: bool,
}

impl Session {
    /// Creates a session with empty state.
    #[must_use]
    pub fn new(key: SessionKey) -> Self {
        Self::with_state(key, SharedState::new())
    }

    /// Creates a session seeded with initial state.
    #[must_use]
    pub fn with_state(key: SessionKey, state: SharedState) -> Self {
        let now = now_utc();
        Self {
            key,
            state,
            created_at: now,
            last_update_time: now,
            has_run: false,
        }
    }

    /// Returns the session identity.
    #[must_use]
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Returns the session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.key.session_id
    }

    /// Returns the session state.
    #[must_use]
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Returns the session state for the stage holding the write turn.
    pub fn state_mut(&mut self) -> &mut SharedState {
        &mut self.state
    }

    /// Returns when the session was created.
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Returns when the session was last run against.
    #[must_use]
    pub fn last_update_time(&self) -> Timestamp {
        self.last_update_time
    }

    /// Returns true once a run has been started against this session.
    #[must_use]
    pub fn has_run(&self) -> bool {
        self.has_run
    }

    pub(crate) fn mark_run(&mut self) {
        self.has_run = true;
    }

    pub(crate) fn touch(&mut self) {
        self.last_update_time = now_utc();
    }
}

/// Stores sessions in process memory, keyed by (application, user, session).
///
/// Nothing is persisted; dropping the service discards every session.
#[derive(Debug, Default)]
pub struct InMemorySessionService {
    sessions: DashMap<SessionKey, SessionHandle>,
}

impl InMemorySessionService {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session, or returns the existing one for the same triple.
    ///
    /// A `None` session id gets a freshly generated one.
    pub fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
    ) -> SessionKey {
        self.create_session_with_state(app_name, user_id, session_id, SharedState::new())
    }

    /// Like [`Self::create_session`], seeding a new session with `state`.
    ///
    /// The seed is ignored when the session already exists.
    pub fn create_session_with_state(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
        state: SharedState,
    ) -> SessionKey {
        let key = session_id.map_or_else(
            || SessionKey::generated(app_name, user_id),
            |id| SessionKey::new(app_name, user_id, id),
        );

        self.sessions.entry(key.clone()).or_insert_with(|| {
            tracing::debug!(session = %key, "Session created");
            Arc::new(Mutex::new(Session::with_state(key.clone(), state)))
        });

        key
    }

    /// Returns the lockable handle for a session.
    #[must_use]
    pub fn handle(&self, key: &SessionKey) -> Option<SessionHandle> {
        self.sessions.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns a copy of a session, waiting for any in-flight run on it.
    pub async fn get_session(&self, key: &SessionKey) -> Option<Session> {
        let handle = self.handle(key)?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    /// Removes a session. Returns true if it existed.
    pub fn delete_session(&self, key: &SessionKey) -> bool {
        self.sessions.remove(key).is_some()
    }

    /// Lists the sessions of one user of one application, ordered by id.
    #[must_use]
    pub fn list_sessions(&self, app_name: &str, user_id: &str) -> Vec<SessionKey> {
        let mut keys: Vec<SessionKey> = self
            .sessions
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| key.app_name == app_name && key.user_id == user_id)
            .collect();
        keys.sort();
        keys
    }

    /// Returns the number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no sessions exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
