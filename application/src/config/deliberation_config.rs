//! Deliberation parameters: round count, note budget, window timing.

use jury_domain::{NotePolicy, NoteRefill, RoundScheduler};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Controller tunables.
///
/// | Field | Default |
/// |-------|---------|
/// | `total_rounds` | 4 |
/// | `responders_per_round` | 2 |
/// | `max_notes` | 3 |
/// | `note_refill` | per debate |
/// | `note_window` | 5s |
/// | `max_note_length` | 200 chars |
/// | `event_buffer` | 1024 |
/// | `ended_retention` | 60s |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliberationConfig {
    pub total_rounds: u32,
    pub responders_per_round: usize,
    pub max_notes: u32,
    pub note_refill: NoteRefill,
    /// How long the note window stays open before the next round
    pub note_window: Duration,
    pub max_note_length: usize,
    /// Capacity of the subscriber channel and of the pre-subscribe backlog
    pub event_buffer: usize,
    /// How long an ended debate stays queryable before its controller retires
    pub ended_retention: Duration,
}

impl Default for DeliberationConfig {
    fn default() -> Self {
        Self {
            total_rounds: 4,
            responders_per_round: 2,
            max_notes: 3,
            note_refill: NoteRefill::PerDebate,
            note_window: Duration::from_secs(5),
            max_note_length: 200,
            event_buffer: 1024,
            ended_retention: Duration::from_secs(60),
        }
    }
}

impl DeliberationConfig {
    // ==================== Builder Methods ====================

    pub fn with_total_rounds(mut self, rounds: u32) -> Self {
        self.total_rounds = rounds.max(1);
        self
    }

    pub fn with_responders_per_round(mut self, count: usize) -> Self {
        self.responders_per_round = count;
        self
    }

    pub fn with_max_notes(mut self, max: u32) -> Self {
        self.max_notes = max;
        self
    }

    pub fn with_note_refill(mut self, refill: NoteRefill) -> Self {
        self.note_refill = refill;
        self
    }

    pub fn with_note_window(mut self, window: Duration) -> Self {
        self.note_window = window;
        self
    }

    pub fn with_max_note_length(mut self, max: usize) -> Self {
        self.max_note_length = max;
        self
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }

    pub fn with_ended_retention(mut self, retention: Duration) -> Self {
        self.ended_retention = retention;
        self
    }

    // ==================== Derived Policies ====================

    pub fn note_policy(&self) -> NotePolicy {
        NotePolicy {
            max_notes: self.max_notes,
            refill: self.note_refill,
            max_length: self.max_note_length,
        }
    }

    pub fn scheduler(&self) -> RoundScheduler {
        RoundScheduler::new(self.responders_per_round)
    }
}
