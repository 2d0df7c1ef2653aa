//! In-process Session Store
//!
//! Keeps every session's roster in a map behind a `tokio::sync::RwLock`.
//! Suitable for a single server process; state is lost on restart.

use async_trait::async_trait;
use jury_application::{SessionStore, StoreError};
use jury_domain::{Juror, JurorId, SessionId, Stance};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Vec<Juror>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a roster under a fresh random session id
    pub async fn create_session(&self, jurors: Vec<Juror>) -> SessionId {
        let id = SessionId::new(Uuid::new_v4().to_string());
        self.insert_session(id.clone(), jurors).await;
        id
    }

    /// Register (or replace) the roster of `id`
    pub async fn insert_session(&self, id: SessionId, jurors: Vec<Juror>) {
        debug!(session = %id, jurors = jurors.len(), "Session stored");
        self.sessions.write().await.insert(id, jurors);
    }

    pub async fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn roster(&self, session: &SessionId) -> Result<Vec<Juror>, StoreError> {
        self.sessions
            .read()
            .await
            .get(session)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(session.to_string()))
    }

    async fn stance(&self, session: &SessionId, juror: &JurorId) -> Result<Stance, StoreError> {
        let sessions = self.sessions.read().await;
        let jurors = sessions
            .get(session)
            .ok_or_else(|| StoreError::NotFound(session.to_string()))?;
        jurors
            .iter()
            .find(|j| &j.id == juror)
            .map(|j| j.stance)
            .ok_or_else(|| StoreError::JurorNotFound(juror.to_string()))
    }

    async fn set_stance(
        &self,
        session: &SessionId,
        juror: &JurorId,
        value: Stance,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let jurors = sessions
            .get_mut(session)
            .ok_or_else(|| StoreError::NotFound(session.to_string()))?;
        let entry = jurors
            .iter_mut()
            .find(|j| &j.id == juror)
            .ok_or_else(|| StoreError::JurorNotFound(juror.to_string()))?;
        entry.stance = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jurors() -> Vec<Juror> {
        vec![
            Juror::new("a", "A", Stance::new(10)),
            Juror::new("b", "B", Stance::new(90)).with_seat(1),
        ]
    }

    #[tokio::test]
    async fn test_create_and_read_session() {
        let store = InMemorySessionStore::new();
        let id = store.create_session(jurors()).await;
        assert_eq!(id.as_str().len(), 36);

        let roster = store.roster(&id).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(store.session_ids().await, vec![id]);
    }

    #[tokio::test]
    async fn test_set_and_get_stance() {
        let store = InMemorySessionStore::new();
        let id = SessionId::from("s1");
        store.insert_session(id.clone(), jurors()).await;

        store
            .set_stance(&id, &"a".into(), Stance::new(42))
            .await
            .unwrap();
        assert_eq!(store.stance(&id, &"a".into()).await.unwrap(), Stance::new(42));
    }

    #[tokio::test]
    async fn test_missing_session_and_juror() {
        let store = InMemorySessionStore::new();
        let id = SessionId::from("s1");
        assert_eq!(
            store.roster(&id).await.unwrap_err(),
            StoreError::NotFound("s1".into())
        );

        store.insert_session(id.clone(), jurors()).await;
        assert_eq!(
            store
                .set_stance(&id, &"zz".into(), Stance::NEUTRAL)
                .await
                .unwrap_err(),
            StoreError::JurorNotFound("zz".into())
        );
        assert_eq!(store.session_ids().await, vec![id]);
    }
}
