//! Domain error types

use thiserror::Error;

/// Errors returned synchronously to the issuer of a deliberation command.
///
/// Generator failures never appear here; they are absorbed by the
/// controller and only show up as a degraded speech.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliberationError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session store unavailable: {0}")]
    SessionUnavailable(String),

    #[error("No notes remaining")]
    NoNoteBudget,

    #[error("Juror is not on the roster: {0}")]
    InvalidTarget(String),

    #[error("Deliberation is not running")]
    NotRunning,

    #[error("Note is too long: {len} characters (max {max})")]
    NoteTooLong { len: usize, max: usize },

    #[error("Note content is empty")]
    EmptyNote,

    #[error("Idempotency key is required")]
    MissingIdempotencyKey,

    #[error("Roster is empty")]
    EmptyRoster,

    #[error("Roster needs at least two jurors, found {0}")]
    RosterTooSmall(usize),

    #[error("Deliberation controller has shut down")]
    ControllerClosed,
}

impl DeliberationError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            DeliberationError::SessionNotFound(_) => "session_not_found",
            DeliberationError::SessionUnavailable(_) => "session_unavailable",
            DeliberationError::NoNoteBudget => "no_note_budget",
            DeliberationError::InvalidTarget(_) => "invalid_target",
            DeliberationError::NotRunning => "not_running",
            DeliberationError::NoteTooLong { .. } => "note_too_long",
            DeliberationError::EmptyNote => "empty_note",
            DeliberationError::MissingIdempotencyKey => "missing_idempotency_key",
            DeliberationError::EmptyRoster => "empty_roster",
            DeliberationError::RosterTooSmall(_) => "roster_too_small",
            DeliberationError::ControllerClosed => "controller_closed",
        }
    }

    /// Whether the caller may retry the same command later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeliberationError::SessionUnavailable(_) | DeliberationError::ControllerClosed
        )
    }
}
