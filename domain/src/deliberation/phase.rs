//! Deliberation lifecycle

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a deliberation's state machine
///
/// ```text
/// Idle ─start─▶ Starting ─▶ RoundActive ─▶ NoteWindow ─┬─▶ RoundActive (more rounds)
///                  │              │             │       └─▶ Ended (last round)
///                  └──────────────┴────skip─────┴──────────▶ Ended
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliberationPhase {
    /// No deliberation exists for the session
    #[default]
    Idle,
    /// Roster loaded, no round scheduled yet
    Starting,
    /// One round's speeches are streaming
    RoundActive,
    /// Interval after a round where notes are expected
    NoteWindow,
    /// Terminal
    Ended,
}

impl DeliberationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliberationPhase::Idle => "idle",
            DeliberationPhase::Starting => "starting",
            DeliberationPhase::RoundActive => "round_active",
            DeliberationPhase::NoteWindow => "note_window",
            DeliberationPhase::Ended => "ended",
        }
    }

    /// Coarse lifecycle status exposed to observers
    pub fn status(&self) -> LifecycleStatus {
        match self {
            DeliberationPhase::Idle => LifecycleStatus::Idle,
            DeliberationPhase::Ended => LifecycleStatus::Ended,
            _ => LifecycleStatus::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status() == LifecycleStatus::Running
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliberationPhase::Ended)
    }
}

impl fmt::Display for DeliberationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `idle` / `running` / `ended`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    Idle,
    Running,
    Ended,
}

impl LifecycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Idle => "idle",
            LifecycleStatus::Running => "running",
            LifecycleStatus::Ended => "ended",
        }
    }
}
