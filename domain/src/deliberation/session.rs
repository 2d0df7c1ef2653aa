//! Deliberation session aggregate
//!
//! [`DeliberationSession`] is the aggregate root of one debate. All state
//! transitions go through its methods; the controller that owns it is the
//! only writer.

use super::note::{Note, NoteLedger, NoteOutcome, NotePolicy};
use super::phase::{DeliberationPhase, LifecycleStatus};
use super::round::{Round, SpeakerRole};
use super::scheduler::{RoundScheduler, SchedulingHistory};
use super::speech::FinalizedSpeech;
use super::transcript::Transcript;
use crate::core::error::DeliberationError;
use crate::core::ids::{JurorId, SessionId};
use crate::juror::{Roster, Stance, StanceDeltas};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time view of a deliberation, used for `state` and resync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub status: LifecycleStatus,
    pub phase: DeliberationPhase,
    pub round: u32,
    pub total_rounds: u32,
    pub notes_remaining: u32,
    pub stances: BTreeMap<JurorId, Stance>,
    pub average_stance: f64,
}

impl SessionSnapshot {
    /// Snapshot for a session with no deliberation
    pub fn idle(session_id: SessionId, total_rounds: u32, notes_remaining: u32) -> Self {
        Self {
            session_id,
            status: LifecycleStatus::Idle,
            phase: DeliberationPhase::Idle,
            round: 0,
            total_rounds,
            notes_remaining,
            stances: BTreeMap::new(),
            average_stance: 0.0,
        }
    }
}

/// What a speech generator needs to know about the debate for one turn
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechBrief {
    pub speaker: JurorId,
    pub role: SpeakerRole,
    pub round: u32,
    pub context: String,
    pub note: Option<String>,
    pub stances: BTreeMap<JurorId, Stance>,
}

/// Aggregate root of one debate
#[derive(Debug, Clone)]
pub struct DeliberationSession {
    id: SessionId,
    phase: DeliberationPhase,
    round: u32,
    total_rounds: u32,
    roster: Roster,
    notes: NoteLedger,
    history: SchedulingHistory,
    transcript: Transcript,
}

impl DeliberationSession {
    /// Create a session in the `Starting` phase.
    ///
    /// A debate needs at least two jurors and at least one round.
    pub fn new(
        id: SessionId,
        roster: Roster,
        total_rounds: u32,
        note_policy: NotePolicy,
    ) -> Result<Self, DeliberationError> {
        match roster.len() {
            0 => return Err(DeliberationError::EmptyRoster),
            1 => return Err(DeliberationError::RosterTooSmall(1)),
            _ => {}
        }
        Ok(Self {
            id,
            phase: DeliberationPhase::Starting,
            round: 0,
            total_rounds: total_rounds.max(1),
            roster,
            notes: NoteLedger::new(note_policy),
            history: SchedulingHistory::default(),
            transcript: Transcript::default(),
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn phase(&self) -> DeliberationPhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn notes_remaining(&self) -> u32 {
        self.notes.remaining()
    }

    pub fn history(&self) -> &SchedulingHistory {
        &self.history
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn has_more_rounds(&self) -> bool {
        self.round < self.total_rounds
    }

    /// `Starting | NoteWindow → RoundActive`: schedule and record the next round.
    pub fn begin_round(&mut self, scheduler: &RoundScheduler) -> Result<Round, DeliberationError> {
        if !matches!(
            self.phase,
            DeliberationPhase::Starting | DeliberationPhase::NoteWindow
        ) || !self.has_more_rounds()
        {
            return Err(DeliberationError::NotRunning);
        }
        let round = scheduler.schedule(self.round + 1, &self.roster, &self.history)?;
        self.round = round.number();
        self.history.record(&round);
        self.phase = DeliberationPhase::RoundActive;
        Ok(round)
    }

    /// Context for the next speech by `speaker`, consuming any note addressed to them
    pub fn brief_for(&mut self, speaker: &JurorId, role: SpeakerRole) -> SpeechBrief {
        SpeechBrief {
            speaker: speaker.clone(),
            role,
            round: self.round,
            context: self.transcript.debate_context(),
            note: self.notes.take_pending(speaker),
            stances: self.roster.stances(),
        }
    }

    /// Apply a finalized speech to the stance model and record it.
    ///
    /// Returns the effective stance changes after clamping.
    pub fn apply_speech(&mut self, speech: &FinalizedSpeech) -> StanceDeltas {
        self.transcript.record(speech);
        self.roster.apply_deltas(&speech.stance_deltas)
    }

    /// `RoundActive → NoteWindow`; returns the note allowance for the window
    pub fn open_note_window(&mut self) -> u32 {
        self.phase = DeliberationPhase::NoteWindow;
        self.notes.open_window()
    }

    pub fn submit_note(&mut self, note: Note) -> Result<NoteOutcome, DeliberationError> {
        if !self.phase.is_running() {
            return Err(DeliberationError::NotRunning);
        }
        self.notes.submit(note, &self.roster)
    }

    /// Move to `Ended`. Returns false if the session had already ended.
    pub fn end(&mut self) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.phase = DeliberationPhase::Ended;
        true
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            status: self.phase.status(),
            phase: self.phase,
            round: self.round,
            total_rounds: self.total_rounds,
            notes_remaining: self.notes.remaining(),
            stances: self.roster.stances(),
            average_stance: self.roster.average_stance(),
        }
    }
}
