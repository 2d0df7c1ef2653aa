//! Note channel state
//!
//! Observers may pass notes to jurors. Each note spends one unit of a
//! limited budget and is applied at most once per idempotency key: a
//! replayed key gets back the acknowledgement recorded the first time.

use crate::core::error::DeliberationError;
use crate::core::ids::JurorId;
use crate::juror::Roster;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// When the note budget is refilled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteRefill {
    /// One pool for the whole debate
    #[default]
    PerDebate,
    /// Refilled every time a note window opens
    PerWindow,
}

impl FromStr for NoteRefill {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "per_debate" | "debate" => Ok(NoteRefill::PerDebate),
            "per_window" | "window" => Ok(NoteRefill::PerWindow),
            other => Err(format!("unknown note refill policy '{other}'")),
        }
    }
}

/// Limits applied to note submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePolicy {
    pub max_notes: u32,
    pub refill: NoteRefill,
    /// Maximum note length in characters
    pub max_length: usize,
}

impl Default for NotePolicy {
    fn default() -> Self {
        Self {
            max_notes: 3,
            refill: NoteRefill::PerDebate,
            max_length: 200,
        }
    }
}

/// An interjection addressed to one juror
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub target_id: JurorId,
    pub content: String,
    pub idempotency_key: String,
}

impl Note {
    pub fn new(
        target_id: impl Into<JurorId>,
        content: impl Into<String>,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            content: content.into(),
            idempotency_key: idempotency_key.into(),
        }
    }
}

/// Acknowledgement returned for an honored note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteAck {
    pub accepted: bool,
    pub target_id: JurorId,
    pub notes_remaining: u32,
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteOutcome {
    /// First use of the key: budget spent, observers should be told
    Accepted(NoteAck),
    /// Replayed key: the original acknowledgement, nothing changed
    Duplicate(NoteAck),
}

impl NoteOutcome {
    pub fn ack(&self) -> &NoteAck {
        match self {
            NoteOutcome::Accepted(ack) | NoteOutcome::Duplicate(ack) => ack,
        }
    }

    pub fn into_ack(self) -> NoteAck {
        match self {
            NoteOutcome::Accepted(ack) | NoteOutcome::Duplicate(ack) => ack,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, NoteOutcome::Duplicate(_))
    }
}

/// Note budget, honored keys and notes waiting for their target to speak
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteLedger {
    policy: NotePolicy,
    remaining: u32,
    honored: HashMap<String, NoteAck>,
    pending: HashMap<JurorId, String>,
}

impl NoteLedger {
    pub fn new(policy: NotePolicy) -> Self {
        Self {
            policy,
            remaining: policy.max_notes,
            honored: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &NotePolicy {
        &self.policy
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Called when a note window opens; returns the allowance for the window
    pub fn open_window(&mut self) -> u32 {
        if self.policy.refill == NoteRefill::PerWindow {
            self.remaining = self.policy.max_notes;
        }
        self.remaining
    }

    /// Validate and record a note.
    ///
    /// Replayed keys are checked before the budget so that a client retry
    /// still succeeds after the last note was spent.
    pub fn submit(&mut self, note: Note, roster: &Roster) -> Result<NoteOutcome, DeliberationError> {
        if note.idempotency_key.trim().is_empty() {
            return Err(DeliberationError::MissingIdempotencyKey);
        }
        if let Some(ack) = self.honored.get(&note.idempotency_key) {
            return Ok(NoteOutcome::Duplicate(ack.clone()));
        }
        if self.remaining == 0 {
            return Err(DeliberationError::NoNoteBudget);
        }
        if !roster.contains(note.target_id.as_str()) {
            return Err(DeliberationError::InvalidTarget(note.target_id.to_string()));
        }
        let content = note.content.trim();
        if content.is_empty() {
            return Err(DeliberationError::EmptyNote);
        }
        let len = content.chars().count();
        if len > self.policy.max_length {
            return Err(DeliberationError::NoteTooLong {
                len,
                max: self.policy.max_length,
            });
        }

        self.remaining -= 1;
        let ack = NoteAck {
            accepted: true,
            target_id: note.target_id.clone(),
            notes_remaining: self.remaining,
        };
        self.honored.insert(note.idempotency_key, ack.clone());
        self.pending.insert(note.target_id, content.to_string());
        Ok(NoteOutcome::Accepted(ack))
    }

    /// Take the note waiting for this juror's next speech, if any
    pub fn take_pending(&mut self, juror: &JurorId) -> Option<String> {
        self.pending.remove(juror)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::juror::{Juror, Stance};

    fn roster() -> Roster {
        Roster::new(vec![
            Juror::new("j1", "One", Stance::new(40)),
            Juror::new("j2", "Two", Stance::new(60)).with_seat(1),
        ])
    }

    #[test]
    fn test_accept_decrements_and_records_pending() {
        let mut ledger = NoteLedger::new(NotePolicy::default());
        let outcome = ledger
            .submit(Note::new("j1", "Look at the logs", "k1"), &roster())
            .unwrap();

        assert!(!outcome.is_duplicate());
        assert_eq!(outcome.ack().notes_remaining, 2);
        assert_eq!(ledger.remaining(), 2);
        assert_eq!(
            ledger.take_pending(&"j1".into()).as_deref(),
            Some("Look at the logs")
        );
        assert_eq!(ledger.take_pending(&"j1".into()), None);
    }

    #[test]
    fn test_replayed_key_returns_first_ack() {
        let mut ledger = NoteLedger::new(NotePolicy::default());
        let first = ledger
            .submit(Note::new("j1", "note", "note-1-1700000000"), &roster())
            .unwrap();
        let second = ledger
            .submit(Note::new("j2", "other", "note-1-1700000000"), &roster())
            .unwrap();

        assert!(second.is_duplicate());
        assert_eq!(first.ack(), second.ack());
        assert_eq!(ledger.remaining(), 2);
        assert_eq!(ledger.honored.len(), 1);
    }

    #[test]
    fn test_replay_succeeds_after_budget_is_spent() {
        let policy = NotePolicy {
            max_notes: 1,
            ..NotePolicy::default()
        };
        let mut ledger = NoteLedger::new(policy);
        ledger.submit(Note::new("j1", "a", "k1"), &roster()).unwrap();
        let replay = ledger.submit(Note::new("j1", "a", "k1"), &roster()).unwrap();
        assert!(replay.is_duplicate());
        assert_eq!(
            ledger.submit(Note::new("j1", "b", "k2"), &roster()),
            Err(DeliberationError::NoNoteBudget)
        );
    }

    #[test]
    fn test_rejections_leave_budget_untouched() {
        let mut ledger = NoteLedger::new(NotePolicy::default());
        let roster = roster();

        assert_eq!(
            ledger.submit(Note::new("nobody", "hi", "k1"), &roster),
            Err(DeliberationError::InvalidTarget("nobody".to_string()))
        );
        assert_eq!(
            ledger.submit(Note::new("j1", "   ", "k2"), &roster),
            Err(DeliberationError::EmptyNote)
        );
        assert_eq!(
            ledger.submit(Note::new("j1", "x".repeat(201), "k3"), &roster),
            Err(DeliberationError::NoteTooLong { len: 201, max: 200 })
        );
        assert_eq!(
            ledger.submit(Note::new("j1", "hi", " "), &roster),
            Err(DeliberationError::MissingIdempotencyKey)
        );
        assert_eq!(ledger.remaining(), 3);
        assert_eq!(ledger.honored.len(), 0);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let mut ledger = NoteLedger::new(NotePolicy::default());
        let note = Note::new("j1", "陪".repeat(200), "k1");
        assert!(ledger.submit(note, &roster()).is_ok());
    }

    #[test]
    fn test_refill_policies() {
        let roster = roster();
        for (refill, expected) in [(NoteRefill::PerDebate, 2), (NoteRefill::PerWindow, 3)] {
            let mut ledger = NoteLedger::new(NotePolicy {
                refill,
                ..NotePolicy::default()
            });
            ledger.submit(Note::new("j1", "a", "k1"), &roster).unwrap();
            assert_eq!(ledger.open_window(), expected);
            assert!(ledger.remaining() <= ledger.policy().max_notes);
        }
    }

    #[test]
    fn test_refill_parse() {
        assert_eq!("per_window".parse::<NoteRefill>().unwrap(), NoteRefill::PerWindow);
        assert_eq!("per-debate".parse::<NoteRefill>().unwrap(), NoteRefill::PerDebate);
        assert!("never".parse::<NoteRefill>().is_err());
    }
}
