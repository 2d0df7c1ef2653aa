//! Deliberation subdomain
//!
//! Everything the debate state machine is made of, free of I/O:
//!
//! - [`phase::DeliberationPhase`]: lifecycle states
//! - [`scheduler::RoundScheduler`]: leader/responder selection
//! - [`speech::Speech`]: streamed turn, finalized exactly once
//! - [`note::NoteLedger`]: note budget and idempotency keys
//! - [`session::DeliberationSession`]: the aggregate root
//! - [`event::DeliberationEvent`]: what observers receive

pub mod event;
pub mod note;
pub mod phase;
pub mod round;
pub mod scheduler;
pub mod session;
pub mod speech;
pub mod transcript;

pub use event::DeliberationEvent;
pub use note::{Note, NoteAck, NoteLedger, NoteOutcome, NotePolicy, NoteRefill};
pub use phase::{DeliberationPhase, LifecycleStatus};
pub use round::{Round, SpeakerRole};
pub use scheduler::{RoundScheduler, SchedulingHistory};
pub use session::{DeliberationSession, SessionSnapshot, SpeechBrief};
pub use speech::{DeltaViolation, FinalizedSpeech, Speech, sanitize_deltas};
pub use transcript::{Transcript, TranscriptEntry};
