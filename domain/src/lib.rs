//! Domain layer for jury-deliberation
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Jurors and stances
//!
//! Each juror holds a stance between 0 (acquit) and 100 (convict). Stances
//! move only when a finalized speech's deltas are applied, and are always
//! clamped back into range.
//!
//! ## Deliberation
//!
//! A debate is a fixed number of rounds. Each round has a leader and one or
//! more responders chosen by the [`RoundScheduler`]; after each round a note
//! window lets the observer pass a note to a juror.

pub mod config;
pub mod core;
pub mod deliberation;
pub mod juror;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigIssueCode, Severity};
pub use core::{
    error::DeliberationError,
    ids::{JurorId, SessionId},
};
pub use deliberation::{
    DeliberationEvent, DeliberationPhase, DeliberationSession, DeltaViolation, FinalizedSpeech,
    LifecycleStatus, Note, NoteAck, NoteLedger, NoteOutcome, NotePolicy, NoteRefill, Round,
    RoundScheduler, SchedulingHistory, SessionSnapshot, SpeakerRole, Speech, SpeechBrief,
    Transcript, sanitize_deltas,
};
pub use juror::{Impact, Juror, MAX_DELTA, Roster, SpeakerProfile, Stance, StanceDeltas, StanceImpact};
