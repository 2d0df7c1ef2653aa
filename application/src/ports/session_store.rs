//! Session Store port
//!
//! Holds the juror roster and stance values of a game session. The
//! deliberation controller reads the roster once at start and writes back
//! every stance it changes.

use async_trait::async_trait;
use jury_domain::{DeliberationError, Juror, JurorId, SessionId, Stance};
use thiserror::Error;

/// Errors that can occur during session store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Juror not found: {0}")]
    JurorNotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for DeliberationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => DeliberationError::SessionNotFound(id),
            StoreError::JurorNotFound(id) => DeliberationError::InvalidTarget(id),
            StoreError::Unavailable(reason) => DeliberationError::SessionUnavailable(reason),
        }
    }
}

/// Storage for session-scoped juror state
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Jurors of the session, in seat order
    async fn roster(&self, session: &SessionId) -> Result<Vec<Juror>, StoreError>;

    /// Current stance of one juror
    async fn stance(&self, session: &SessionId, juror: &JurorId) -> Result<Stance, StoreError>;

    /// Overwrite one juror's stance
    async fn set_stance(
        &self,
        session: &SessionId,
        juror: &JurorId,
        value: Stance,
    ) -> Result<(), StoreError>;
}
