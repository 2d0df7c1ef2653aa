//! Speech entity
//!
//! A [`Speech`] accumulates streamed text for one speaker's turn. It is
//! consumed by [`Speech::finalize`], so a speech can only be finalized once;
//! the resulting [`FinalizedSpeech`] carries the authoritative text and the
//! validated stance deltas.

use super::round::SpeakerRole;
use crate::core::ids::JurorId;
use crate::juror::{MAX_DELTA, Roster, StanceDeltas};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One speaker's turn while it is streaming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speech {
    speaker: JurorId,
    role: SpeakerRole,
    round: u32,
    text: String,
    chunks: usize,
}

impl Speech {
    pub fn new(speaker: JurorId, role: SpeakerRole, round: u32) -> Self {
        Self {
            speaker,
            role,
            round,
            text: String::new(),
            chunks: 0,
        }
    }

    pub fn speaker(&self) -> &JurorId {
        &self.speaker
    }

    pub fn role(&self) -> SpeakerRole {
        self.role
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Text accumulated from chunks so far
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    pub fn push_chunk(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        self.chunks += 1;
    }

    /// Finalize with the generator's authoritative text and validated deltas.
    ///
    /// An empty `full_text` falls back to the accumulated chunks.
    pub fn finalize(self, full_text: String, stance_deltas: StanceDeltas) -> FinalizedSpeech {
        let full_text = if full_text.is_empty() {
            self.text
        } else {
            full_text
        };
        FinalizedSpeech {
            speaker: self.speaker,
            role: self.role,
            round: self.round,
            full_text,
            stance_deltas,
            degraded: false,
        }
    }

    /// Finalize after a generator failure: partial text, no stance change.
    pub fn finalize_degraded(self) -> FinalizedSpeech {
        FinalizedSpeech {
            speaker: self.speaker,
            role: self.role,
            round: self.round,
            full_text: self.text,
            stance_deltas: StanceDeltas::new(),
            degraded: true,
        }
    }
}

/// A completed speech, ready to be applied to the stance model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedSpeech {
    pub speaker: JurorId,
    pub role: SpeakerRole,
    pub round: u32,
    pub full_text: String,
    pub stance_deltas: StanceDeltas,
    /// True when the generator failed and the text may be truncated
    pub degraded: bool,
}

/// A stance delta that broke the generator contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaViolation {
    /// Key is not a juror on the roster; the entry is dropped
    UnknownJuror(String),
    /// Value outside `[-100, 100]`; replaced by zero
    OutOfRange { juror: JurorId, delta: i32 },
}

/// Enforce the delta contract: keys must be roster ids and each value must
/// lie within `[-100, 100]`.
pub fn sanitize_deltas(
    raw: &BTreeMap<String, i32>,
    roster: &Roster,
) -> (StanceDeltas, Vec<DeltaViolation>) {
    let mut deltas = StanceDeltas::new();
    let mut violations = Vec::new();

    for (key, &delta) in raw {
        let Some(juror) = roster.get(key) else {
            violations.push(DeltaViolation::UnknownJuror(key.clone()));
            continue;
        };
        if !(-MAX_DELTA..=MAX_DELTA).contains(&delta) {
            violations.push(DeltaViolation::OutOfRange {
                juror: juror.id.clone(),
                delta,
            });
            deltas.insert(juror.id.clone(), 0);
            continue;
        }
        deltas.insert(juror.id.clone(), delta);
    }

    (deltas, violations)
}
