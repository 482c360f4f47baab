//! In-process table of adventures and live sessions.
//!
//! Adventures are immutable and shared between sessions through `Arc`. Each
//! session sits behind its own `Mutex`, so one session never waits on another
//! and at most one action per session is applied at a time.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::action::{ActionOutcome, PlayerAction};
use crate::adventure::Adventure;
use crate::clock::Clock;
use crate::error::{EngineError, EntityKind};
use crate::progress::SessionProgress;
use crate::session::{QuestSession, SessionOutcome};

type SharedSession = Arc<Mutex<QuestSession>>;

pub struct SessionRegistry<C: Clock> {
    clock: C,
    adventures: RwLock<HashMap<String, Arc<Adventure>>>,
    sessions: RwLock<HashMap<String, SharedSession>>,
    next_id: AtomicU64,
}

fn lock(session: &SharedSession) -> MutexGuard<'_, QuestSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<C: Clock> SessionRegistry<C> {
    #[must_use]
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            adventures: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Make an adventure available to new sessions. Replaces any adventure with
    /// the same id; sessions already running keep the content they started with.
    pub fn register_adventure(&self, adventure: Adventure) -> Arc<Adventure> {
        let adventure = Arc::new(adventure);
        let previous = self
            .adventures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(adventure.id().to_string(), Arc::clone(&adventure));
        if previous.is_some() {
            log::warn!("adventure '{}' re-registered", adventure.id());
        }
        adventure
    }

    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unregistered adventure.
    pub fn adventure(&self, adventure_id: &str) -> Result<Arc<Adventure>, EngineError> {
        self.adventures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(adventure_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(EntityKind::Adventure, adventure_id))
    }

    /// Start a session and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unregistered adventure.
    pub fn start_session(
        &self,
        adventure_id: &str,
        team: Vec<String>,
    ) -> Result<String, EngineError> {
        let adventure = self.adventure(adventure_id)?;
        let session = QuestSession::new(adventure, team, self.clock.now_secs());
        Ok(self.insert(adventure_id, session))
    }

    /// Resume persisted progress under a new session id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unregistered adventure, or a
    /// `content_mismatch` rejection if the content changed.
    pub fn restore_session(&self, progress: SessionProgress) -> Result<String, EngineError> {
        let adventure_id = progress.adventure_id.clone();
        let adventure = self.adventure(&adventure_id)?;
        let session = QuestSession::from_progress(adventure, progress)?;
        Ok(self.insert(&adventure_id, session))
    }

    fn insert(&self, adventure_id: &str, session: QuestSession) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = format!("{adventure_id}-{n:04}");
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        id
    }

    fn session(&self, session_id: &str) -> Result<SharedSession, EngineError> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(EntityKind::Session, session_id))
    }

    /// Apply an action to one session, timestamped by the registry clock.
    /// Ending the session also drops it from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown session, otherwise
    /// whatever the action itself returns.
    pub fn dispatch(
        &self,
        session_id: &str,
        action: PlayerAction,
    ) -> Result<ActionOutcome, EngineError> {
        if matches!(action, PlayerAction::EndSession) {
            return self
                .end_session(session_id)
                .map(|outcome| ActionOutcome::Ended { outcome });
        }
        let session = self.session(session_id)?;
        let now = self.clock.now_secs();
        let result = lock(&session).apply(action, now);
        if let Err(err) = &result {
            log::debug!("session {session_id} refused action: {err}");
        }
        result
    }

    /// End a session and drop it from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown session.
    pub fn end_session(&self, session_id: &str) -> Result<SessionOutcome, EngineError> {
        let session = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Session, session_id))?;
        let now = self.clock.now_secs();
        lock(&session).end_session(now)
    }

    /// Copy of a session's progress.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown session.
    pub fn snapshot(&self, session_id: &str) -> Result<SessionProgress, EngineError> {
        let session = self.session(session_id)?;
        let progress = lock(&session).progress().clone();
        Ok(progress)
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
