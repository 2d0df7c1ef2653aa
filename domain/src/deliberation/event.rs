//! Observer-facing deliberation events
//!
//! Each variant maps to one named event on the push stream. Payload field
//! names are snake_case.

use super::round::{Round, SpeakerRole};
use super::session::SessionSnapshot;
use super::speech::FinalizedSpeech;
use crate::core::ids::JurorId;
use crate::juror::StanceDeltas;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum DeliberationEvent {
    #[serde(rename = "debate.start")]
    DebateStart { total_rounds: u32 },

    #[serde(rename = "round.start")]
    RoundStart {
        round: u32,
        leader_id: JurorId,
        responder_ids: Vec<JurorId>,
    },

    #[serde(rename = "speech.chunk")]
    SpeechChunk {
        speaker_id: JurorId,
        round: u32,
        role: SpeakerRole,
        text: String,
    },

    #[serde(rename = "speech.end")]
    SpeechEnd {
        speaker_id: JurorId,
        round: u32,
        role: SpeakerRole,
        full_text: String,
        stance_deltas: StanceDeltas,
    },

    #[serde(rename = "note.window")]
    NoteWindow { round: u32, notes_remaining: u32 },

    #[serde(rename = "note.received")]
    NoteReceived {
        target_id: JurorId,
        notes_remaining: u32,
    },

    /// Sent first to a subscriber that attaches after the stream began
    #[serde(rename = "state.sync")]
    StateSync(SessionSnapshot),

    #[serde(rename = "debate.end")]
    DebateEnd {},
}

impl DeliberationEvent {
    pub fn round_start(round: &Round) -> Self {
        DeliberationEvent::RoundStart {
            round: round.number(),
            leader_id: round.leader().clone(),
            responder_ids: round.responders().to_vec(),
        }
    }

    pub fn speech_end(speech: &FinalizedSpeech) -> Self {
        DeliberationEvent::SpeechEnd {
            speaker_id: speech.speaker.clone(),
            round: speech.round,
            role: speech.role,
            full_text: speech.full_text.clone(),
            stance_deltas: speech.stance_deltas.clone(),
        }
    }

    /// Event name on the wire
    pub fn name(&self) -> &'static str {
        match self {
            DeliberationEvent::DebateStart { .. } => "debate.start",
            DeliberationEvent::RoundStart { .. } => "round.start",
            DeliberationEvent::SpeechChunk { .. } => "speech.chunk",
            DeliberationEvent::SpeechEnd { .. } => "speech.end",
            DeliberationEvent::NoteWindow { .. } => "note.window",
            DeliberationEvent::NoteReceived { .. } => "note.received",
            DeliberationEvent::StateSync(_) => "state.sync",
            DeliberationEvent::DebateEnd {} => "debate.end",
        }
    }

    /// Event payload as JSON
    pub fn data(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove("data").unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    /// Whether the stream closes after this event
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliberationEvent::DebateEnd {})
    }
}
