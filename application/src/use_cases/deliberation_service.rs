//! Deliberation Service
//!
//! Routes commands for many sessions to their controller tasks. The service
//! never touches session state itself; it only owns the id → handle map.
//! Controllers of ended debates retire on their own after `ended_retention`;
//! their entries are pruned here on the next `start`.

use crate::config::DeliberationConfig;
use crate::ports::session_store::SessionStore;
use crate::ports::speech_generator::SpeechGenerator;
use crate::use_cases::deliberation_controller::{ControllerHandle, EventReceiver};
use jury_domain::{
    DeliberationError, DeliberationPhase, Note, NoteAck, SessionId, SessionSnapshot,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

pub struct DeliberationService<S: SessionStore + 'static, G: SpeechGenerator + 'static> {
    store: Arc<S>,
    generator: Arc<G>,
    config: DeliberationConfig,
    controllers: Mutex<HashMap<SessionId, ControllerHandle>>,
}

impl<S: SessionStore + 'static, G: SpeechGenerator + 'static> DeliberationService<S, G> {
    pub fn new(store: Arc<S>, generator: Arc<G>, config: DeliberationConfig) -> Self {
        Self {
            store,
            generator,
            config,
            controllers: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &DeliberationConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn controllers(&self) -> MutexGuard<'_, HashMap<SessionId, ControllerHandle>> {
        // A poisoned map is still structurally valid
        self.controllers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn handle(&self, session: &SessionId) -> Option<ControllerHandle> {
        self.controllers()
            .get(session)
            .filter(|h| !h.is_closed())
            .cloned()
    }

    fn running(&self, session: &SessionId) -> Result<ControllerHandle, DeliberationError> {
        self.handle(session).ok_or(DeliberationError::NotRunning)
    }

    /// Start (or re-attach to) the deliberation of `session`.
    pub async fn start(&self, session: &SessionId) -> Result<SessionSnapshot, DeliberationError> {
        let handle = {
            let mut controllers = self.controllers();
            controllers.retain(|_, h| !h.is_closed());
            match controllers.get(session) {
                Some(handle) if !handle.is_closed() => handle.clone(),
                _ => {
                    debug!(session = %session, "Spawning controller");
                    let handle = ControllerHandle::spawn(
                        session.clone(),
                        self.store.clone(),
                        self.generator.clone(),
                        self.config.clone(),
                    );
                    controllers.insert(session.clone(), handle.clone());
                    handle
                }
            }
        };

        let result = handle.start().await;
        // A controller that never got past idle is dropped so the next start retries cleanly
        if result.is_err()
            && handle
                .state()
                .await
                .is_ok_and(|s| s.phase == DeliberationPhase::Idle)
        {
            let mut controllers = self.controllers();
            if controllers
                .get(session)
                .is_some_and(|h| h.same_controller(&handle))
            {
                controllers.remove(session);
                handle.shutdown();
            }
        }
        result
    }

    pub async fn submit_note(
        &self,
        session: &SessionId,
        note: Note,
    ) -> Result<NoteAck, DeliberationError> {
        self.running(session)?.submit_note(note).await
    }

    pub async fn skip(&self, session: &SessionId) -> Result<SessionSnapshot, DeliberationError> {
        self.running(session)?.skip().await
    }

    pub async fn advance(&self, session: &SessionId) -> Result<SessionSnapshot, DeliberationError> {
        self.running(session)?.advance().await
    }

    /// Current snapshot; an idle snapshot for sessions without a deliberation.
    pub async fn state(&self, session: &SessionId) -> Result<SessionSnapshot, DeliberationError> {
        match self.handle(session) {
            Some(handle) => handle.state().await,
            None => Ok(SessionSnapshot::idle(
                session.clone(),
                self.config.total_rounds,
                self.config.max_notes,
            )),
        }
    }

    pub async fn subscribe(&self, session: &SessionId) -> Result<EventReceiver, DeliberationError> {
        self.running(session)?.subscribe().await
    }

    /// Stop the controller and forget the deliberation. Returns whether one existed.
    pub fn reset(&self, session: &SessionId) -> bool {
        match self.controllers().remove(session) {
            Some(handle) => {
                info!(session = %session, "Deliberation reset");
                handle.shutdown();
                true
            }
            None => false,
        }
    }

    /// Number of live controllers, forgetting retired ones
    pub fn active_sessions(&self) -> usize {
        let mut controllers = self.controllers();
        controllers.retain(|_, h| !h.is_closed());
        controllers.len()
    }
}
