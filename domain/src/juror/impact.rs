//! Topic-weighted persuasion policy
//!
//! The deliberation engine does not decide how persuasive a speech is; that
//! is the speech generator's job. This module holds the policy that the
//! bundled generators use, so that it can be tested in isolation.
//!
//! For each listener:
//!
//! ```text
//! delta = Σ weight(topic) × impact_factor × speaker_power × damping
//! damping = max(0, 1 - |listener - speaker| / 100)
//! ```
//!
//! halved when the listener is already entrenched (below 15 or above 85),
//! then rounded to the nearest integer.

use super::stance::{Stance, StanceDeltas};
use crate::core::ids::JurorId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Direction of a speech's effect on listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    /// Pushes listeners toward conviction
    Positive,
    /// Pushes listeners toward acquittal
    Negative,
    /// Weak push in the direction of the topic weights
    #[default]
    Neutral,
}

impl Impact {
    pub fn factor(self) -> f64 {
        match self {
            Impact::Positive => 1.0,
            Impact::Negative => -1.0,
            Impact::Neutral => 0.3,
        }
    }
}

impl FromStr for Impact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "positive" => Ok(Impact::Positive),
            "negative" => Ok(Impact::Negative),
            "neutral" => Ok(Impact::Neutral),
            other => Err(format!("unknown impact '{other}'")),
        }
    }
}

/// Persuasion-related traits of one juror
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerProfile {
    /// How strongly this juror sways others when speaking (0.0 to 1.0)
    pub speaker_power: f64,
    /// How much each topic moves this juror when listening
    pub topic_weights: HashMap<String, i32>,
}

impl Default for SpeakerProfile {
    fn default() -> Self {
        Self {
            speaker_power: 0.5,
            topic_weights: HashMap::new(),
        }
    }
}

impl SpeakerProfile {
    pub fn weight(&self, topic: &str) -> i32 {
        self.topic_weights.get(topic).copied().unwrap_or(0)
    }
}

/// The persuasive content of one speech
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StanceImpact {
    pub topics: Vec<String>,
    pub impact: Impact,
}

/// Listeners at or beyond these bounds are harder to move
const ENTRENCHED_LOW: u8 = 15;
const ENTRENCHED_HIGH: u8 = 85;

impl StanceImpact {
    pub fn new(topics: Vec<String>, impact: Impact) -> Self {
        Self { topics, impact }
    }

    /// Delta for one listener
    pub fn listener_delta(
        &self,
        speaker_stance: Stance,
        speaker_power: f64,
        listener_stance: Stance,
        listener: &SpeakerProfile,
    ) -> i32 {
        let damping = (1.0 - f64::from(listener_stance.distance(speaker_stance)) / 100.0).max(0.0);
        let mut total: f64 = self
            .topics
            .iter()
            .map(|topic| {
                f64::from(listener.weight(topic)) * self.impact.factor() * speaker_power * damping
            })
            .sum();

        let value = listener_stance.value();
        if value < ENTRENCHED_LOW || value > ENTRENCHED_HIGH {
            total *= 0.5;
        }
        total.round() as i32
    }

    /// Deltas for every listener other than the speaker.
    ///
    /// `listeners` yields `(id, stance, profile)`; every listener gets an
    /// entry, including zero deltas.
    pub fn deltas<'a>(
        &self,
        speaker: &JurorId,
        speaker_stance: Stance,
        speaker_power: f64,
        listeners: impl IntoIterator<Item = (&'a JurorId, Stance, &'a SpeakerProfile)>,
    ) -> StanceDeltas {
        listeners
            .into_iter()
            .filter(|(id, _, _)| *id != speaker)
            .map(|(id, stance, profile)| {
                (
                    id.clone(),
                    self.listener_delta(speaker_stance, speaker_power, stance, profile),
                )
            })
            .collect()
    }
}
